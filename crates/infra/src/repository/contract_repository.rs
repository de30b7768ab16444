//! # ContractRepository
//!
//! 契約の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **楽観的ロック**: 更新は `version` が一致する場合のみ成功し、不一致は `Conflict`
//! - **書き込みは TxContext 必須**: 承認時のプロビジョニング失敗でロールバックできるようにする
//! - **一覧は新しい順**: `created_at DESC, id DESC`（UUID v7 で同時刻でも順序が安定する）
//! - **動的フィルタ**: `sqlx::QueryBuilder` で WHERE 句を組み立てる

use async_trait::async_trait;
use busify_domain::{
    contract::{
        Contract,
        ContractDetails,
        ContractId,
        ContractPeriod,
        ContractRecord,
        ContractStatus,
    },
    value_objects::{
        Actor,
        Address,
        AdminNote,
        Email,
        OperationArea,
        PhoneNumber,
        VatCode,
        Version,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 一覧取得のフィルタ条件
///
/// ステータスは完全一致、メールアドレスと運行エリアは大文字小文字を無視した部分一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractFilter {
    pub status:         Option<ContractStatus>,
    pub email:          Option<String>,
    pub operation_area: Option<String>,
}

impl ContractFilter {
    /// 空白のみの文字列条件を未指定として正規化する
    pub fn normalized(self) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            status:         self.status,
            email:          non_blank(self.email),
            operation_area: non_blank(self.operation_area),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.email.is_none() && self.operation_area.is_none()
    }
}

/// ページ指定（1 始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page:  u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// 一覧取得の結果
#[derive(Debug, Clone)]
pub struct ContractPage {
    pub items: Vec<Contract>,
    /// フィルタ条件に一致する総件数
    pub total: i64,
}

/// 契約リポジトリトレイト
#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// 新規契約を挿入する
    async fn insert(&self, tx: &mut TxContext, contract: &Contract) -> Result<(), InfraError>;

    /// 楽観的ロック付きで契約を更新する
    ///
    /// `expected_version` と DB 上のバージョンが一致する場合のみ更新する。
    /// 不一致（または行が存在しない）の場合は `InfraErrorKind::Conflict` を返す。
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        contract: &Contract,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    /// ID で契約を検索する
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, InfraError>;

    /// メールアドレス（大文字小文字を無視した完全一致）で契約一覧を取得する
    async fn find_by_email(&self, email: &Email) -> Result<Vec<Contract>, InfraError>;

    /// フィルタ条件とページ指定で契約一覧を取得する
    async fn find_page(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<ContractPage, InfraError>;

    /// ステータスごとの件数を取得する
    async fn count_by_status(&self, status: ContractStatus) -> Result<i64, InfraError>;
}

/// contracts テーブルの行
#[derive(sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    email: String,
    phone: String,
    address: String,
    vat_code: String,
    operation_area: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    license_url: Option<String>,
    status: String,
    admin_note: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    version: i32,
    created_by: String,
    last_modified_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = InfraError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        let details = ContractDetails {
            email:          Email::new(row.email)?,
            phone:          PhoneNumber::new(row.phone)?,
            address:        Address::new(row.address)?,
            vat_code:       VatCode::new(row.vat_code)?,
            operation_area: OperationArea::new(row.operation_area)?,
            period:         ContractPeriod::new(row.start_date, row.end_date)?,
        };

        Ok(Contract::from_db(ContractRecord {
            id: ContractId::from_uuid(row.id),
            details,
            license_url: row.license_url,
            status: row.status.parse::<ContractStatus>()?,
            admin_note: AdminNote::optional(row.admin_note)?,
            approved_at: row.approved_at,
            version: Version::try_from(row.version)?,
            created_by: Actor::new(row.created_by)?,
            last_modified_by: Actor::new(row.last_modified_by)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?)
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, email, phone, address, vat_code, operation_area,
        start_date, end_date, license_url, status, admin_note, approved_at,
        version, created_by, last_modified_by, created_at, updated_at
    FROM contracts
"#;

/// LIKE の部分一致パターンを作る（`%` `_` `\` はエスケープする）
fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// フィルタ条件の WHERE 句を追加する
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ContractFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        let status: &'static str = status.into();
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(email) = &filter.email {
        builder
            .push(" AND email ILIKE ")
            .push_bind(contains_pattern(email));
    }
    if let Some(area) = &filter.operation_area {
        builder
            .push(" AND operation_area ILIKE ")
            .push_bind(contains_pattern(area));
    }
}

/// PostgreSQL 実装の ContractRepository
#[derive(Debug, Clone)]
pub struct PostgresContractRepository {
    pool: PgPool,
}

impl PostgresContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContractRepository for PostgresContractRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(contract_id = %contract.id()))]
    async fn insert(&self, tx: &mut TxContext, contract: &Contract) -> Result<(), InfraError> {
        let details = contract.details();
        let status: &str = contract.status().into();
        sqlx::query(
            r#"
            INSERT INTO contracts (
                id, email, phone, address, vat_code, operation_area,
                start_date, end_date, license_url, status, admin_note, approved_at,
                version, created_by, last_modified_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(contract.id().as_uuid())
        .bind(details.email.as_str())
        .bind(details.phone.as_str())
        .bind(details.address.as_str())
        .bind(details.vat_code.as_str())
        .bind(details.operation_area.as_str())
        .bind(details.period.start_date())
        .bind(details.period.end_date())
        .bind(contract.license_url())
        .bind(status)
        .bind(contract.admin_note().map(AdminNote::as_str))
        .bind(contract.approved_at())
        .bind(contract.version().as_i32())
        .bind(contract.created_by().as_str())
        .bind(contract.last_modified_by().as_str())
        .bind(contract.created_at())
        .bind(contract.updated_at())
        .execute(tx.conn())
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(contract_id = %contract.id()))]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        contract: &Contract,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let details = contract.details();
        let status: &str = contract.status().into();
        let result = sqlx::query(
            r#"
            UPDATE contracts SET
                email = $1,
                phone = $2,
                address = $3,
                vat_code = $4,
                operation_area = $5,
                start_date = $6,
                end_date = $7,
                license_url = $8,
                status = $9,
                admin_note = $10,
                approved_at = $11,
                version = $12,
                last_modified_by = $13,
                updated_at = $14
            WHERE id = $15 AND version = $16
            "#,
        )
        .bind(details.email.as_str())
        .bind(details.phone.as_str())
        .bind(details.address.as_str())
        .bind(details.vat_code.as_str())
        .bind(details.operation_area.as_str())
        .bind(details.period.start_date())
        .bind(details.period.end_date())
        .bind(contract.license_url())
        .bind(status)
        .bind(contract.admin_note().map(AdminNote::as_str))
        .bind(contract.approved_at())
        .bind(contract.version().as_i32())
        .bind(contract.last_modified_by().as_str())
        .bind(contract.updated_at())
        .bind(contract.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(tx.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "Contract",
                contract.id().as_uuid().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, InfraError> {
        let row = sqlx::query_as::<_, ContractRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Contract::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_email(&self, email: &Email) -> Result<Vec<Contract>, InfraError> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "{SELECT_COLUMNS} WHERE LOWER(email) = LOWER($1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Contract::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(page = page.page, limit = page.limit))]
    async fn find_page(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<ContractPage, InfraError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM contracts");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select_query = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut select_query, filter);
        select_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select_query
            .build_query_as::<ContractRow>()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Contract::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContractPage { items, total })
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%status))]
    async fn count_by_status(&self, status: ContractStatus) -> Result<i64, InfraError> {
        let status_str: &str = status.into();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE status = $1")
            .bind(status_str)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
