//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（Mailpit 開発用）、SES（本番用）、Noop（テスト用）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択
//! - **添付ファイル**: MIME の組み立ては [`build_mime_message`] に集約し、SMTP と SES で共有する

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
use busify_domain::notification::EmailMessage;
use lettre::message::{Attachment, Message, MultiPart, SinglePart, header::ContentType};
pub use noop::NoopNotificationSender;
pub use ses::{SesNotificationSender, create_client as create_ses_client};
pub use smtp::SmtpNotificationSender;
use thiserror::Error;

/// メール転送エラー
///
/// 呼び出し側で通知種別を付けて `NotificationError::SendFailed` に包む。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MailTransportError(String);

impl MailTransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// メール送信トレイト
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する（リトライしない）
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailTransportError>;
}

/// lettre の MIME メッセージを組み立てる
///
/// 構造:
///
/// ```text
/// multipart/mixed
/// ├── multipart/alternative
/// │   ├── text/plain
/// │   └── text/html
/// └── 添付ファイル（0 個以上）
/// ```
///
/// 添付がない場合は `multipart/alternative` のみ。
pub fn build_mime_message(
    from_address: &str,
    email: &EmailMessage,
) -> Result<Message, MailTransportError> {
    let alternative = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        );

    let body = if email.attachments.is_empty() {
        alternative
    } else {
        let mut mixed = MultiPart::mixed().multipart(alternative);
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                MailTransportError::new(format!(
                    "添付ファイルの Content-Type が不正 ({}): {e}",
                    attachment.filename
                ))
            })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.data.clone(), content_type),
            );
        }
        mixed
    };

    Message::builder()
        .from(
            from_address
                .parse()
                .map_err(|e| MailTransportError::new(format!("送信元アドレス不正: {e}")))?,
        )
        .to(email
            .to
            .parse()
            .map_err(|e| MailTransportError::new(format!("宛先アドレス不正: {e}")))?)
        .subject(&email.subject)
        .multipart(body)
        .map_err(|e| MailTransportError::new(format!("メッセージ構築失敗: {e}")))
}
