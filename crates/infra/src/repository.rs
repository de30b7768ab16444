//! # リポジトリ実装
//!
//! ## 設計方針
//!
//! - **トレイト経由**: ユースケース層はトレイトに依存し、テストではモックに差し替える
//! - **書き込みは TxContext 必須**: 契約の書き込みはトランザクション内でのみ行う

pub mod contract_repository;
pub mod notification_log_repository;

pub use contract_repository::{
    ContractFilter,
    ContractPage,
    ContractRepository,
    PageRequest,
    PostgresContractRepository,
};
pub use notification_log_repository::{
    NotificationLog,
    NotificationLogRepository,
    NotificationLogStatus,
    PostgresNotificationLogRepository,
};
