//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。

use async_trait::async_trait;
use busify_domain::notification::EmailMessage;

use super::{MailTransportError, NotificationSender};

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailTransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_emailがエラーを返さない() {
        let email = EmailMessage {
            to:          "khach@example.com".to_string(),
            subject:     "Thông báo hủy vé".to_string(),
            html_body:   "<p>TK-001</p>".to_string(),
            text_body:   "TK-001".to_string(),
            attachments: vec![],
        };

        assert!(NoopNotificationSender.send_email(&email).await.is_ok());
    }
}
