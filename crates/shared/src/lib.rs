//! # Busify 共有ユーティリティ
//!
//! ワークスペース内の全クレートから利用される共通型とロギング基盤。
//!
//! ## 設計方針
//!
//! - domain / infra / core-service のいずれからも依存される
//! - ビジネスロジックを持たない
//! - axum などの Web フレームワークには依存しない（HTTP 変換は各サービスの責務）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;
pub mod paginated_response;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
pub use paginated_response::{PageInfo, PaginatedResponse};
