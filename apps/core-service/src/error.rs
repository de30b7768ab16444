//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | バリアント | HTTP |
//! |-----------|------|
//! | `BadRequest` / `Validation` / `InvalidAction` | 400 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `InvalidStatus` / `Conflict` | 409 |
//! | `UploadFailed` / `ProvisioningFailed` | 502 |
//! | `Database` / `Internal` | 500（詳細は返さない） |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use busify_domain::DomainError;
use busify_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// 不正なリクエスト（クエリ範囲外、添付のエンコード不正など）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力値の検証エラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 未知の審査アクション
    #[error("不正な審査アクションです: {0}")]
    InvalidAction(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 現在のステータスでは操作できない
    #[error("{0}")]
    InvalidStatus(String),

    /// 競合（楽観的ロック失敗）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 添付ファイルのアップロード失敗
    #[error("添付ファイル {filename} のアップロードに失敗しました: {reason}")]
    UploadFailed { filename: String, reason: String },

    /// 運行会社プロビジョニングの失敗
    #[error("運行会社のプロビジョニングに失敗しました（契約 {contract_id}, {email}）: {reason}")]
    ProvisioningFailed {
        contract_id: String,
        email:       String,
        reason:      String,
    },

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] busify_infra::InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for CoreError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidAction(action) => Self::InvalidAction(action),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ DomainError::InvalidStatus { .. } => Self::InvalidStatus(e.to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl CoreError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::BadRequest(msg) => ErrorResponse::bad_request(msg),
            Self::Validation(msg) => ErrorResponse::validation_error(msg),
            Self::InvalidAction(_) => {
                ErrorResponse::new("invalid-review-action", "Bad Request", 400, self.to_string())
            }
            Self::Forbidden(msg) => ErrorResponse::new("forbidden", "Forbidden", 403, msg),
            Self::NotFound(msg) => ErrorResponse::not_found(msg),
            Self::InvalidStatus(msg) => {
                ErrorResponse::new("invalid-contract-status", "Conflict", 409, msg)
            }
            Self::Conflict(msg) => ErrorResponse::conflict(msg),
            Self::UploadFailed { .. } => {
                ErrorResponse::bad_gateway("attachment-upload-failed", self.to_string())
            }
            Self::ProvisioningFailed { .. } => {
                ErrorResponse::bad_gateway("provisioning-failed", self.to_string())
            }
            Self::Database(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DATABASE,
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            Self::Internal(msg) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use busify_infra::InfraError;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CoreError::BadRequest("page".into()), StatusCode::BAD_REQUEST)]
    #[case(CoreError::Validation("email".into()), StatusCode::BAD_REQUEST)]
    #[case(CoreError::InvalidAction("ARCHIVE".into()), StatusCode::BAD_REQUEST)]
    #[case(CoreError::NotFound("契約".into()), StatusCode::NOT_FOUND)]
    #[case(CoreError::InvalidStatus("承認済み".into()), StatusCode::CONFLICT)]
    #[case(CoreError::Conflict("version".into()), StatusCode::CONFLICT)]
    #[case(
        CoreError::UploadFailed { filename: "gpkd.pdf".into(), reason: "timeout".into() },
        StatusCode::BAD_GATEWAY
    )]
    #[case(
        CoreError::ProvisioningFailed {
            contract_id: "c-1".into(),
            email:       "nhaxe@example.com".into(),
            reason:      "503".into(),
        },
        StatusCode::BAD_GATEWAY
    )]
    #[case(CoreError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_エラー種別ごとのステータスコード(
        #[case] error: CoreError,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn test_データベースエラーは詳細を返さない() {
        let body = CoreError::Database(InfraError::unexpected("connection refused"))
            .to_error_response();

        assert_eq!(body.status, 500);
        assert_eq!(body.detail, "内部エラーが発生しました");
    }

    #[test]
    fn test_アップロード失敗はファイル名を含む() {
        let body = CoreError::UploadFailed {
            filename: "giay-phep.pdf".to_string(),
            reason:   "AccessDenied".to_string(),
        }
        .to_error_response();

        assert!(body.detail.contains("giay-phep.pdf"));
        assert_eq!(
            body.error_type,
            "https://busify.example.com/errors/attachment-upload-failed"
        );
    }

    #[test]
    fn test_プロビジョニング失敗は契約idとメールを含む() {
        let err = CoreError::ProvisioningFailed {
            contract_id: "0190c0de-0000-7000-8000-000000000001".to_string(),
            email:       "nhaxe@phuongtrang.vn".to_string(),
            reason:      "503 Service Unavailable".to_string(),
        };

        let message = err.to_string();

        assert!(message.contains("0190c0de-0000-7000-8000-000000000001"));
        assert!(message.contains("nhaxe@phuongtrang.vn"));
    }

    #[test]
    fn test_ドメインエラーを対応するバリアントに変換する() {
        let status_err: CoreError = DomainError::InvalidStatus {
            operation: "更新",
            status:    "ACCEPTED".to_string(),
        }
        .into();
        let action_err: CoreError = DomainError::InvalidAction("ARCHIVE".to_string()).into();

        assert!(matches!(status_err, CoreError::InvalidStatus(msg) if msg.contains("ACCEPTED")));
        assert!(matches!(action_err, CoreError::InvalidAction(a) if a == "ARCHIVE"));
    }
}
