//! # 運行契約
//!
//! バス運行会社が提出するライセンス申請（契約）と、その審査ステートマシンを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`Contract`] | 契約 | 運行会社の申請。管理者の審査対象 |
//! | [`ContractStatus`] | 契約ステータス | PENDING / NEED_REVISION / ACCEPTED / REJECTED |
//! | [`ReviewAction`] | 審査アクション | APPROVE / REJECT / REQUEST_REVISION |
//!
//! ## 状態遷移
//!
//! ```text
//!             update                 review(APPROVE)
//!   PENDING ◀─────────┐   PENDING ─────────────────▶ ACCEPTED
//!      ▲              │      │    review(REJECT)
//!      │ update       │      ├──────────────────────▶ REJECTED
//!      │              │      │    review(REQUEST_REVISION)
//!   NEED_REVISION ────┘      └──────────────────────▶ NEED_REVISION
//! ```
//!
//! - 更新は PENDING / NEED_REVISION のときのみ可能で、常に PENDING に戻す
//! - 審査も PENDING / NEED_REVISION のときのみ可能
//! - ACCEPTED / REJECTED は終端状態
//!
//! 状態固有のフィールド（承認日時）は [`ContractState`] に持たせ、
//! 「ACCEPTED なのに承認日時がない」状態を作れないようにする。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
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

define_uuid_id! {
    /// 契約 ID
    pub struct ContractId;
}

/// 契約ステータス
///
/// DB と API では `SCREAMING_SNAKE_CASE`（`NEED_REVISION` など）で表す。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// 審査待ち
    Pending,
    /// 修正依頼中
    NeedRevision,
    /// 承認済み
    Accepted,
    /// 却下
    Rejected,
}

impl ContractStatus {
    /// 運行会社が内容を更新できるステータスか
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Pending | Self::NeedRevision)
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = DomainError;

    /// 大文字小文字を区別せずにパースする
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "NEED_REVISION" => Ok(Self::NeedRevision),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な契約ステータス: {s}"
            ))),
        }
    }
}

/// 審査アクション
///
/// 管理者が契約に対して下す判断。閉じた列挙型で、未知の文字列は
/// [`DomainError::InvalidAction`] としてパース時に拒否する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    /// 承認
    Approve,
    /// 却下
    Reject,
    /// 修正依頼
    RequestRevision,
}

impl ReviewAction {
    /// アクション適用後のステータス
    pub fn resulting_status(&self) -> ContractStatus {
        match self {
            Self::Approve => ContractStatus::Accepted,
            Self::Reject => ContractStatus::Rejected,
            Self::RequestRevision => ContractStatus::NeedRevision,
        }
    }
}

impl std::str::FromStr for ReviewAction {
    type Err = DomainError;

    /// 大文字小文字を区別せずにパースする（`"approve"` も `"APPROVE"` も可）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "REQUEST_REVISION" => Ok(Self::RequestRevision),
            _ => Err(DomainError::InvalidAction(s.to_string())),
        }
    }
}

/// 契約期間
///
/// 終了日は開始日以降。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPeriod {
    start_date: NaiveDate,
    end_date:   NaiveDate,
}

impl ContractPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, DomainError> {
        if end_date < start_date {
            return Err(DomainError::Validation(
                "契約終了日は開始日以降である必要があります".to_string(),
            ));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

/// 運行会社が入力・更新する契約内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDetails {
    pub email:          Email,
    pub phone:          PhoneNumber,
    pub address:        Address,
    pub vat_code:       VatCode,
    pub operation_area: OperationArea,
    pub period:         ContractPeriod,
}

/// ACCEPTED 状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedState {
    pub approved_at: DateTime<Utc>,
}

/// 契約の状態（ADT ベースステートマシン）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractState {
    Pending,
    NeedRevision,
    Accepted(AcceptedState),
    Rejected,
}

/// 契約エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    id: ContractId,
    details: ContractDetails,
    license_url: Option<String>,
    admin_note: Option<AdminNote>,
    version: Version,
    created_by: Actor,
    last_modified_by: Actor,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    state: ContractState,
}

/// 契約の新規作成パラメータ
pub struct NewContract {
    pub id: ContractId,
    pub details: ContractDetails,
    pub license_url: Option<String>,
    pub actor: Actor,
    pub now: DateTime<Utc>,
}

/// 契約の DB 復元パラメータ
///
/// DB のフラットな行を表す。`from_db()` で不変条件を検証して ADT に変換する。
pub struct ContractRecord {
    pub id: ContractId,
    pub details: ContractDetails,
    pub license_url: Option<String>,
    pub status: ContractStatus,
    pub admin_note: Option<AdminNote>,
    pub approved_at: Option<DateTime<Utc>>,
    pub version: Version,
    pub created_by: Actor,
    pub last_modified_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// 新しい契約を PENDING で作成する
    pub fn new(params: NewContract) -> Self {
        Self {
            id: params.id,
            details: params.details,
            license_url: params.license_url,
            admin_note: None,
            version: Version::initial(),
            created_by: params.actor.clone(),
            last_modified_by: params.actor,
            created_at: params.now,
            updated_at: params.now,
            state: ContractState::Pending,
        }
    }

    /// DB の行から復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: ACCEPTED なのに `approved_at` がない、
    ///   または ACCEPTED 以外で `approved_at` がある
    pub fn from_db(record: ContractRecord) -> Result<Self, DomainError> {
        let state = match (record.status, record.approved_at) {
            (ContractStatus::Accepted, Some(approved_at)) => {
                ContractState::Accepted(AcceptedState { approved_at })
            }
            (ContractStatus::Accepted, None) => {
                return Err(DomainError::Validation(
                    "ACCEPTED の契約には approved_at が必要です".to_string(),
                ));
            }
            (status, Some(_)) => {
                return Err(DomainError::Validation(format!(
                    "{status} の契約に approved_at は設定できません"
                )));
            }
            (ContractStatus::Pending, None) => ContractState::Pending,
            (ContractStatus::NeedRevision, None) => ContractState::NeedRevision,
            (ContractStatus::Rejected, None) => ContractState::Rejected,
        };

        Ok(Self {
            id: record.id,
            details: record.details,
            license_url: record.license_url,
            admin_note: record.admin_note,
            version: record.version,
            created_by: record.created_by,
            last_modified_by: record.last_modified_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &ContractId {
        &self.id
    }

    pub fn details(&self) -> &ContractDetails {
        &self.details
    }

    pub fn email(&self) -> &Email {
        &self.details.email
    }

    pub fn license_url(&self) -> Option<&str> {
        self.license_url.as_deref()
    }

    pub fn admin_note(&self) -> Option<&AdminNote> {
        self.admin_note.as_ref()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_by(&self) -> &Actor {
        &self.created_by
    }

    pub fn last_modified_by(&self) -> &Actor {
        &self.last_modified_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn state(&self) -> &ContractState {
        &self.state
    }

    pub fn status(&self) -> ContractStatus {
        match self.state {
            ContractState::Pending => ContractStatus::Pending,
            ContractState::NeedRevision => ContractStatus::NeedRevision,
            ContractState::Accepted(_) => ContractStatus::Accepted,
            ContractState::Rejected => ContractStatus::Rejected,
        }
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ContractState::Accepted(accepted) => Some(accepted.approved_at),
            _ => None,
        }
    }

    // ビジネスロジックメソッド

    /// 内容を更新できるかチェックする
    ///
    /// 添付ファイルのアップロードなど、副作用の前に呼び出す。
    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status().is_editable() {
            Ok(())
        } else {
            Err(DomainError::InvalidStatus {
                operation: "更新",
                status:    self.status().to_string(),
            })
        }
    }

    /// 内容を更新した契約を返す
    ///
    /// ステータスは常に PENDING に戻る。`license_url` が `Some` の場合のみ差し替える。
    pub fn updated(
        self,
        details: ContractDetails,
        license_url: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_editable()?;

        Ok(Self {
            details,
            license_url: license_url.or(self.license_url),
            version: self.version.next(),
            last_modified_by: actor,
            updated_at: now,
            state: ContractState::Pending,
            ..self
        })
    }

    /// 審査結果を反映した契約を返す
    ///
    /// 審査コメントは指定値で上書きする（`None` なら消える）。
    /// APPROVE の場合は `now` を承認日時として記録する。
    pub fn reviewed(
        self,
        action: ReviewAction,
        admin_note: Option<AdminNote>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !self.status().is_editable() {
            return Err(DomainError::InvalidStatus {
                operation: "審査",
                status:    self.status().to_string(),
            });
        }

        let state = match action {
            ReviewAction::Approve => ContractState::Accepted(AcceptedState { approved_at: now }),
            ReviewAction::Reject => ContractState::Rejected,
            ReviewAction::RequestRevision => ContractState::NeedRevision,
        };

        Ok(Self {
            admin_note,
            version: self.version.next(),
            last_modified_by: actor,
            updated_at: now,
            state,
            ..self
        })
    }
}
