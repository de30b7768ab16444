//! SES 通知送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。
//! 添付ファイルがない場合は Simple、ある場合は Raw（MIME 全体）で送る。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    primitives::Blob,
    types::{Body, Content, Destination, EmailContent, Message, RawMessage},
};
use busify_domain::notification::EmailMessage;

use super::{MailTransportError, NotificationSender, build_mime_message};

/// SES v2 クライアントを作成する
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する。未設定時は ap-southeast-1。
pub async fn create_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(
            aws_config::meta::region::RegionProviderChain::default_provider()
                .or_else(aws_config::Region::new("ap-southeast-1")),
        )
        .load()
        .await;
    Client::new(&config)
}

/// SES 通知送信
pub struct SesNotificationSender {
    client:       Client,
    from_address: String,
}

impl SesNotificationSender {
    /// # 引数
    ///
    /// - `client`: AWS SES v2 クライアント
    /// - `from_address`: 送信元メールアドレス（SES で検証済みであること）
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }

    fn content(data: &str, part: &str) -> Result<Content, MailTransportError> {
        Content::builder()
            .data(data)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailTransportError::new(format!("{part}構築失敗: {e}")))
    }

    fn simple_content(email: &EmailMessage) -> Result<EmailContent, MailTransportError> {
        let message = Message::builder()
            .subject(Self::content(&email.subject, "件名")?)
            .body(
                Body::builder()
                    .html(Self::content(&email.html_body, "HTML 本文")?)
                    .text(Self::content(&email.text_body, "テキスト本文")?)
                    .build(),
            )
            .build();
        Ok(EmailContent::builder().simple(message).build())
    }

    fn raw_content(&self, email: &EmailMessage) -> Result<EmailContent, MailTransportError> {
        let mime = build_mime_message(&self.from_address, email)?;
        let raw = RawMessage::builder()
            .data(Blob::new(mime.formatted()))
            .build()
            .map_err(|e| MailTransportError::new(format!("Raw メッセージ構築失敗: {e}")))?;
        Ok(EmailContent::builder().raw(raw).build())
    }
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailTransportError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let content = if email.attachments.is_empty() {
            Self::simple_content(email)?
        } else {
            self.raw_content(email)?
        };

        self.client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| MailTransportError::new(format!("SES 送信失敗: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SesNotificationSender>();
    }

    #[test]
    fn test_simple_contentは件名と本文を含む() {
        let email = EmailMessage {
            to:          "khach@example.com".to_string(),
            subject:     "Đặt lại mật khẩu".to_string(),
            html_body:   "<p>link</p>".to_string(),
            text_body:   "link".to_string(),
            attachments: vec![],
        };

        let content = SesNotificationSender::simple_content(&email).unwrap();

        let subject = content.simple().unwrap().subject().unwrap().data();
        assert_eq!(subject, "Đặt lại mật khẩu");
    }
}
