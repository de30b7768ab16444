//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! サービス共通のエラーボディ。
//!
//! ## 設計
//!
//! - 純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - `IntoResponse` への変換は各サービス側で行う
//! - よく使う種別は便利コンストラクタで提供し、`type` URI の組み立てを一箇所に集める

use serde::{Deserialize, Serialize};

/// `type` URI のベースパス
const ERROR_TYPE_BASE: &str = "https://busify.example.com/errors";

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    /// 汎用コンストラクタ
    ///
    /// `error_type_suffix` はベース URI に付加される（例: `"invalid-contract-status"`）。
    pub fn new(
        error_type_suffix: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{error_type_suffix}"),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("bad-request", "Bad Request", 400, detail)
    }

    /// 404 Not Found
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("not-found", "Not Found", 404, detail)
    }

    /// 409 Conflict
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new("conflict", "Conflict", 409, detail)
    }

    /// 400 Validation Error
    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::new("validation-error", "Validation Error", 400, detail)
    }

    /// 502 Bad Gateway
    ///
    /// 外部サービス（オブジェクトストレージ、プロビジョニング）の失敗。
    pub fn bad_gateway(error_type_suffix: &str, detail: impl Into<String>) -> Self {
        Self::new(error_type_suffix, "Bad Gateway", 502, detail)
    }

    /// 500 Internal Server Error
    ///
    /// detail は固定値。内部情報をクライアントに返さない。
    pub fn internal_error() -> Self {
        Self::new(
            "internal-error",
            "Internal Server Error",
            500,
            "内部エラーが発生しました",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newでベースuriにsuffixを連結する() {
        let error = ErrorResponse::new(
            "invalid-contract-status",
            "Conflict",
            409,
            "承認済みの契約は更新できません",
        );

        assert_eq!(
            error.error_type,
            "https://busify.example.com/errors/invalid-contract-status"
        );
        assert_eq!(error.status, 409);
    }

    #[test]
    fn test_internal_errorは固定のdetailを返す() {
        let error = ErrorResponse::internal_error();

        assert_eq!(error.status, 500);
        assert_eq!(error.detail, "内部エラーが発生しました");
    }

    #[test]
    fn test_jsonではtypeフィールド名でシリアライズされる() {
        let error = ErrorResponse::bad_request("page は 1 以上である必要があります");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["type"], "https://busify.example.com/errors/bad-request");
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["status"], 400);
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn test_便利コンストラクタのstatus() {
        assert_eq!(ErrorResponse::bad_request("").status, 400);
        assert_eq!(ErrorResponse::not_found("").status, 404);
        assert_eq!(ErrorResponse::conflict("").status, 409);
        assert_eq!(ErrorResponse::validation_error("").status, 400);
        assert_eq!(ErrorResponse::bad_gateway("upstream", "").status, 502);
    }
}
