//! # ドメイン層エラー定義
//!
//! ビジネスルール違反を表すエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗、未知の審査アクション |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 現在の状態では許可されない操作 |
//! | `Forbidden` | 403 Forbidden | 権限不足 |
//!
//! 状態遷移の違反は専用のバリアント（[`DomainError::InvalidStatus`]）で返し、
//! API 層で固有の `type` URI を付けられるようにする。
//!
//! ```rust
//! use busify_domain::DomainError;
//!
//! fn validate_limit(limit: u32) -> Result<(), DomainError> {
//!     if limit == 0 {
//!         return Err(DomainError::Validation("limit は 1 以上である必要があります".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// 入力値がビジネスルールに違反している
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが存在しない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Contract" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 現在のステータスでは操作できない
    ///
    /// 承認済み・却下済みの契約の更新や審査など。
    #[error("{operation}できないステータスです: {status}")]
    InvalidStatus {
        /// 試みた操作（"更新"、"審査"）
        operation: &'static str,
        /// 現在のステータス
        status:    String,
    },

    /// 未知の審査アクション
    #[error("不正な審査アクションです: {0}")]
    InvalidAction(String),

    /// 競合
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),
}
