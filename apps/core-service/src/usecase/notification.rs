//! # 通知ユースケース
//!
//! 乗客・運行会社向けメール通知の生成・送信・ログ記録を統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成
//! - [`ticket_pdf`] - 乗車券 PDF と QR コードの生成
//! - [`format`] - 金額・日時の vi-VN 表記
//! - [`service`] - レンダリング + 送信 + ログ記録の統合サービス
//! - [`dispatcher`] - バックグラウンドタスクでの送信と同時実行数の制限

pub mod dispatcher;
pub mod format;
pub mod service;
pub mod template_renderer;
pub mod ticket_pdf;

pub use dispatcher::NotificationDispatcher;
pub use service::NotificationService;
pub use template_renderer::TemplateRenderer;
pub use ticket_pdf::TicketPdfRenderer;
