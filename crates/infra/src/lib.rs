//! # Busify インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とトランザクション
//! - **リポジトリ実装**: 契約・通知ログの永続化
//! - **オブジェクトストレージ**: ライセンスファイルの S3 保存
//! - **メール送信**: SMTP / SES / Noop
//! - **外部 API クライアント**: 運行会社プロビジョニング
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続管理、`TxContext`
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信
//! - [`provisioning`] - 運行会社プロビジョニング
//! - [`repository`] - リポジトリ実装
//! - [`s3`] - オブジェクトストレージ

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod provisioning;
pub mod repository;
pub mod s3;

pub use error::{InfraError, InfraErrorKind};
