//! # 通知サービス
//!
//! テンプレートレンダリング → 添付 PDF 生成 → メール送信 → ログ記録を統合するサービス。
//!
//! ## 設計方針
//!
//! - **リトライしない**: 転送エラーは通知種別を付けた `NotificationError::SendFailed` に包んで返す
//! - **ログ記録**: 送信試行は成功・失敗どちらも `notification_logs` テーブルに記録
//! - **ログ記録の失敗は握りつぶす**: tracing に出力するだけで送信結果には影響しない
//! - **依存性注入**: `NotificationSender` と `NotificationLogRepository` は trait で抽象化

use std::sync::Arc;

use busify_domain::{
    clock::Clock,
    notification::{
        EmailAttachment,
        EmailMessage,
        Notification,
        NotificationError,
        NotificationLogId,
    },
};
use busify_infra::{
    notification::NotificationSender,
    repository::{NotificationLog, NotificationLogRepository, NotificationLogStatus},
};
use busify_shared::{
    event_log::{error as error_log, event},
    log_business_event,
};

use super::{
    TemplateRenderer,
    TicketPdfRenderer,
    ticket_pdf::{TICKET_PDF_FILENAME, TicketDocument},
};

/// 通知サービス
pub struct NotificationService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
    pdf_renderer:      TicketPdfRenderer,
    log_repo:          Arc<dyn NotificationLogRepository>,
    clock:             Arc<dyn Clock>,
    frontend_url:      String,
}

impl NotificationService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        template_renderer: TemplateRenderer,
        pdf_renderer: TicketPdfRenderer,
        log_repo: Arc<dyn NotificationLogRepository>,
        clock: Arc<dyn Clock>,
        frontend_url: String,
    ) -> Self {
        Self {
            sender,
            template_renderer,
            pdf_renderer,
            log_repo,
            clock,
            frontend_url,
        }
    }

    /// 通知からメールメッセージを組み立てる
    ///
    /// 乗車券確認には乗車券 PDF を 1 つ添付する。
    pub fn compose(&self, notification: &Notification) -> Result<EmailMessage, NotificationError> {
        let mut email = self
            .template_renderer
            .render(notification, &self.frontend_url)?;

        if let Some(document) = TicketDocument::from_notification(notification)? {
            let data = self.pdf_renderer.render(&document)?;
            email.attachments.push(EmailAttachment {
                filename: TICKET_PDF_FILENAME.to_string(),
                content_type: "application/pdf".to_string(),
                data,
            });
        }

        Ok(email)
    }

    /// 通知を送信し、結果を通知ログに記録する
    #[tracing::instrument(skip_all, fields(kind = %notification.kind()))]
    pub async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let kind = notification.kind();
        let kind_str: &str = kind.into();
        let email = self.compose(&notification)?;

        let result = self.sender.send_email(&email).await;

        let (status, error_message) = match &result {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.result = event::result::SUCCESS,
                    notification.kind = kind_str,
                    notification.attachments = email.attachments.len(),
                    "通知メール送信成功"
                );
                (NotificationLogStatus::Sent, None)
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.result = event::result::FAILURE,
                    notification.kind = kind_str,
                    error = %e,
                    "通知メール送信失敗"
                );
                (NotificationLogStatus::Failed, Some(e.to_string()))
            }
        };

        let log = NotificationLog {
            id: NotificationLogId::new(),
            kind,
            recipient_email: email.to,
            subject: email.subject,
            status,
            error_message,
            sent_at: self.clock.now(),
        };
        if let Err(e) = self.log_repo.insert(&log).await {
            tracing::error!(
                error.category = error_log::category::INFRASTRUCTURE,
                error.kind = error_log::kind::DATABASE,
                error = %e,
                "通知ログの記録に失敗"
            );
        }

        result.map_err(|e| NotificationError::SendFailed {
            kind,
            reason: e.to_string(),
        })
    }
}
