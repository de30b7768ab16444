//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリと外部サービスを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `contract`: 運行会社契約の登録・更新・審査
//! - `notification`: メール通知の生成と送信

pub(crate) mod helpers;

pub mod contract;
pub mod notification;

pub use contract::{
    ContractInput,
    ContractUseCaseImpl,
    CreateContractInput,
    LicenseFile,
    ListContractsInput,
    ReviewContractInput,
    UpdateContractInput,
};
pub use notification::{
    NotificationDispatcher,
    NotificationService,
    TemplateRenderer,
    TicketPdfRenderer,
};
