//! # 契約ハンドラ
//!
//! 運行会社契約の内部 API を提供する。
//!
//! ## エンドポイント
//!
//! - `POST /internal/contracts` - 契約作成
//! - `GET /internal/contracts` - 契約一覧（ページネーション・フィルタ）
//! - `GET /internal/contracts/mine?email=` - 運行会社自身の契約一覧
//! - `GET /internal/contracts/count?status=` - ステータス別件数
//! - `GET /internal/contracts/{contract_id}` - 契約詳細
//! - `PUT /internal/contracts/{contract_id}` - 契約更新
//! - `POST /internal/contracts/{contract_id}/review` - 審査
//!
//! 操作者はリクエストボディの `actor` で受け取る（認証は呼び出し元のゲートウェイが担う）。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use busify_domain::contract::{Contract, ContractId, ContractStatus};
use busify_shared::{ApiResponse, PageInfo, PaginatedResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    usecase::{
        ContractInput,
        ContractUseCaseImpl,
        CreateContractInput,
        LicenseFile,
        ListContractsInput,
        ReviewContractInput,
        UpdateContractInput,
    },
};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// 契約 API の共有状態
pub struct ContractState {
    pub usecase: ContractUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 添付ファイル（Base64）
#[derive(Debug, Deserialize)]
pub struct AttachmentPayload {
    pub filename:     String,
    pub content_type: String,
    pub data_base64:  String,
}

impl AttachmentPayload {
    fn decode(self) -> Result<LicenseFile, CoreError> {
        let data = STANDARD.decode(self.data_base64.as_bytes()).map_err(|e| {
            CoreError::BadRequest(format!(
                "添付ファイル {} の Base64 デコードに失敗しました: {e}",
                self.filename
            ))
        })?;
        Ok(LicenseFile {
            filename: self.filename,
            content_type: self.content_type,
            data,
        })
    }
}

/// 契約内容（作成・更新で共通）
#[derive(Debug, Deserialize)]
pub struct ContractPayload {
    pub email:          String,
    pub phone:          String,
    pub address:        String,
    pub vat_code:       String,
    pub operation_area: String,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
    pub license:        Option<AttachmentPayload>,
    pub actor:          String,
}

impl ContractPayload {
    fn into_parts(self) -> Result<(ContractInput, Option<LicenseFile>, String), CoreError> {
        let license = self.license.map(AttachmentPayload::decode).transpose()?;
        let contract = ContractInput {
            email:          self.email,
            phone:          self.phone,
            address:        self.address,
            vat_code:       self.vat_code,
            operation_area: self.operation_area,
            start_date:     self.start_date,
            end_date:       self.end_date,
        };
        Ok((contract, license, self.actor))
    }
}

/// 審査リクエスト
#[derive(Debug, Deserialize)]
pub struct ReviewContractRequest {
    pub action:     String,
    pub admin_note: Option<String>,
    pub actor:      String,
}

/// 一覧クエリ
#[derive(Debug, Deserialize)]
pub struct ListContractsQuery {
    pub page:           Option<u32>,
    pub limit:          Option<u32>,
    pub status:         Option<String>,
    pub email:          Option<String>,
    pub operation_area: Option<String>,
}

/// 運行会社メールアドレスクエリ
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// ステータスクエリ
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// 契約 DTO
#[derive(Debug, Serialize)]
pub struct ContractDto {
    pub id:               Uuid,
    pub email:            String,
    pub phone:            String,
    pub address:          String,
    pub vat_code:         String,
    pub operation_area:   String,
    pub start_date:       NaiveDate,
    pub end_date:         NaiveDate,
    pub license_url:      Option<String>,
    pub status:           ContractStatus,
    pub admin_note:       Option<String>,
    pub approved_at:      Option<DateTime<Utc>>,
    pub version:          i32,
    pub created_by:       String,
    pub last_modified_by: String,
    pub created_at:       DateTime<Utc>,
    pub updated_at:       DateTime<Utc>,
}

impl From<&Contract> for ContractDto {
    fn from(contract: &Contract) -> Self {
        let details = contract.details();
        Self {
            id:               *contract.id().as_uuid(),
            email:            details.email.as_str().to_string(),
            phone:            details.phone.as_str().to_string(),
            address:          details.address.as_str().to_string(),
            vat_code:         details.vat_code.as_str().to_string(),
            operation_area:   details.operation_area.as_str().to_string(),
            start_date:       details.period.start_date(),
            end_date:         details.period.end_date(),
            license_url:      contract.license_url().map(str::to_string),
            status:           contract.status(),
            admin_note:       contract.admin_note().map(|n| n.as_str().to_string()),
            approved_at:      contract.approved_at(),
            version:          contract.version().as_i32(),
            created_by:       contract.created_by().as_str().to_string(),
            last_modified_by: contract.last_modified_by().as_str().to_string(),
            created_at:       contract.created_at(),
            updated_at:       contract.updated_at(),
        }
    }
}

/// 件数 DTO
#[derive(Debug, Serialize)]
pub struct ContractCountDto {
    pub status: ContractStatus,
    pub count:  i64,
}

// --- ハンドラ ---

/// POST /internal/contracts
///
/// ## レスポンス
///
/// - `201 Created`: 作成された契約（PENDING）
/// - `400 Bad Request`: 入力不正、添付のエンコード不正
/// - `502 Bad Gateway`: 添付ファイルのアップロード失敗
#[tracing::instrument(skip_all)]
pub async fn create_contract(
    State(state): State<Arc<ContractState>>,
    Json(req): Json<ContractPayload>,
) -> Result<impl IntoResponse, CoreError> {
    let (contract, license, actor) = req.into_parts()?;

    let created = state
        .usecase
        .create_contract(CreateContractInput {
            contract,
            license,
            actor,
        })
        .await?;

    let response = ApiResponse::new(ContractDto::from(&created));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /internal/contracts
///
/// 作成日時の降順。フィルタ未指定なら全件が対象。
#[tracing::instrument(skip_all)]
pub async fn list_contracts(
    State(state): State<Arc<ContractState>>,
    Query(query): Query<ListContractsQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let result = state
        .usecase
        .list_contracts(ListContractsInput {
            page,
            limit,
            status: query.status,
            email: query.email,
            operation_area: query.operation_area,
        })
        .await?;

    let items = result.items.iter().map(ContractDto::from).collect();
    let response = PaginatedResponse::new(items, PageInfo::new(page, limit, result.total));
    Ok((StatusCode::OK, Json(response)))
}

/// GET /internal/contracts/mine?email=
#[tracing::instrument(skip_all)]
pub async fn list_my_contracts(
    State(state): State<Arc<ContractState>>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let contracts = state.usecase.list_contracts_by_email(&query.email).await?;

    let items: Vec<ContractDto> = contracts.iter().map(ContractDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /internal/contracts/count?status=
#[tracing::instrument(skip_all)]
pub async fn count_contracts(
    State(state): State<Arc<ContractState>>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, CoreError> {
    let count = state.usecase.count_by_status(&query.status).await?;
    let status = query
        .status
        .parse::<ContractStatus>()
        .map_err(CoreError::from)?;

    let response = ApiResponse::new(ContractCountDto { status, count });
    Ok((StatusCode::OK, Json(response)))
}

/// GET /internal/contracts/{contract_id}
#[tracing::instrument(skip_all, fields(%contract_id))]
pub async fn get_contract(
    State(state): State<Arc<ContractState>>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let contract = state
        .usecase
        .get_contract(&ContractId::from_uuid(contract_id))
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(ContractDto::from(&contract)))))
}

/// PUT /internal/contracts/{contract_id}
///
/// 更新後のステータスは常に PENDING。
///
/// ## レスポンス
///
/// - `200 OK`: 更新後の契約
/// - `404 Not Found`: 契約が見つからない
/// - `409 Conflict`: ACCEPTED / REJECTED の契約、または楽観的ロック失敗
#[tracing::instrument(skip_all, fields(%contract_id))]
pub async fn update_contract(
    State(state): State<Arc<ContractState>>,
    Path(contract_id): Path<Uuid>,
    Json(req): Json<ContractPayload>,
) -> Result<impl IntoResponse, CoreError> {
    let (contract, license, actor) = req.into_parts()?;

    let updated = state
        .usecase
        .update_contract(UpdateContractInput {
            contract_id: ContractId::from_uuid(contract_id),
            contract,
            license,
            actor,
        })
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(ContractDto::from(&updated)))))
}

/// POST /internal/contracts/{contract_id}/review
///
/// ## レスポンス
///
/// - `200 OK`: 審査後の契約
/// - `400 Bad Request`: 未知の審査アクション
/// - `409 Conflict`: 審査済みの契約
/// - `502 Bad Gateway`: 承認時のプロビジョニング失敗（契約は審査前のまま）
#[tracing::instrument(skip_all, fields(%contract_id, action = %req.action))]
pub async fn review_contract(
    State(state): State<Arc<ContractState>>,
    Path(contract_id): Path<Uuid>,
    Json(req): Json<ReviewContractRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let reviewed = state
        .usecase
        .review_contract(ReviewContractInput {
            contract_id: ContractId::from_uuid(contract_id),
            action:      req.action,
            admin_note:  req.admin_note,
            actor:       req.actor,
        })
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(ContractDto::from(&reviewed)))))
}
