//! # ビジネスイベントログ
//!
//! `jq` で後から追跡できるよう、ビジネスイベントのフィールド命名とマクロを揃える。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] で出力する。`event.kind = "business_event"` が自動付与され、
//! `jq 'select(.["event.kind"] == "business_event")'` で抽出できる。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）。JSON 出力ではフラットなキーになる。

/// ビジネスイベントを INFO レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
///
/// ## 推奨フィールド
///
/// - `event.entity_type` / `event.entity_id`
/// - `event.actor`: 操作者
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const CONTRACT: &str = "contract";
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベントアクション
    pub mod action {
        // 契約
        pub const CONTRACT_CREATED: &str = "contract.created";
        pub const CONTRACT_UPDATED: &str = "contract.updated";
        pub const CONTRACT_APPROVED: &str = "contract.approved";
        pub const CONTRACT_REJECTED: &str = "contract.rejected";
        pub const CONTRACT_REVISION_REQUESTED: &str = "contract.revision_requested";
        pub const OPERATOR_PROVISIONING_FAILED: &str = "contract.provisioning_failed";

        // 通知
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const CONTRACT: &str = "contract";
        pub const NOTIFICATION_LOG: &str = "notification_log";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` に `error.category` と `error.kind` を直接付ける。
pub mod error {
    pub mod category {
        /// DB、オブジェクトストレージ
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// プロビジョニングサービス、メール送信
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const OBJECT_STORAGE: &str = "object_storage";
        pub const PROVISIONING: &str = "provisioning";
        pub const MAIL_TRANSPORT: &str = "mail_transport";
        pub const INTERNAL: &str = "internal";
    }
}
