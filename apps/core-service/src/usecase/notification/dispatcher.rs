//! # 通知ディスパッチャ
//!
//! 通知送信をリクエストから切り離してバックグラウンドタスクで実行する。
//!
//! 同時に走る送信タスクの数はセマフォで制限する。待ち行列の順序は保証しない。
//! 送信エラーはタスク内でログに出すだけで、呼び出し元には返らない。

use std::sync::Arc;

use busify_domain::notification::Notification;
use busify_shared::event_log::error::{category, kind};
use tokio::{sync::Semaphore, task::JoinHandle};

use super::NotificationService;

/// 通知ディスパッチャ
#[derive(Clone)]
pub struct NotificationDispatcher {
    service:   Arc<NotificationService>,
    semaphore: Arc<Semaphore>,
}

impl NotificationDispatcher {
    /// `max_concurrency` は 1 以上
    pub fn new(service: Arc<NotificationService>, max_concurrency: usize) -> Self {
        Self {
            service,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// 通知をキューに積む（fire-and-forget）
    ///
    /// 戻り値のハンドルはテストで完了を待つためのもので、呼び出し元は捨ててよい。
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let semaphore = Arc::clone(&self.semaphore);
        let notification_kind = notification.kind();

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::INTERNAL,
                    notification.kind = %notification_kind,
                    "通知セマフォが閉じられているため送信を中止"
                );
                return;
            };

            if let Err(e) = service.send(notification).await {
                tracing::error!(
                    error.category = category::EXTERNAL_SERVICE,
                    error.kind = kind::MAIL_TRANSPORT,
                    notification.kind = %notification_kind,
                    error = %e,
                    "通知の送信に失敗"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use busify_domain::{
        clock::FixedClock,
        test_support::fixed_now,
        value_objects::Email,
    };
    use busify_infra::mock::{MockNotificationLogRepository, MockNotificationSender};

    use super::*;
    use crate::usecase::notification::{TemplateRenderer, TicketPdfRenderer};

    fn make_dispatcher(
        sender: MockNotificationSender,
        log_repo: MockNotificationLogRepository,
        max_concurrency: usize,
    ) -> NotificationDispatcher {
        let service = NotificationService::new(
            Arc::new(sender),
            TemplateRenderer::new().unwrap(),
            TicketPdfRenderer::builtin(),
            Arc::new(log_repo),
            Arc::new(FixedClock::new(fixed_now())),
            "http://localhost:5173".to_string(),
        );
        NotificationDispatcher::new(Arc::new(service), max_concurrency)
    }

    fn simple(n: usize) -> Notification {
        Notification::Simple {
            to:      Email::new(format!("khach{n}@example.com")).unwrap(),
            subject: format!("Thông báo {n}"),
            content: "Xin chào".to_string(),
        }
    }

    #[tokio::test]
    async fn ディスパッチした通知はバックグラウンドで送信される() {
        let sender = MockNotificationSender::new();
        let log_repo = MockNotificationLogRepository::new();
        let dispatcher = make_dispatcher(sender.clone(), log_repo.clone(), 2);

        let handles: Vec<_> = (0..5).map(|n| dispatcher.dispatch(simple(n))).collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut recipients: Vec<String> = sender.sent_emails().into_iter().map(|e| e.to).collect();
        recipients.sort();
        assert_eq!(
            recipients,
            (0..5)
                .map(|n| format!("khach{n}@example.com"))
                .collect::<Vec<_>>()
        );
        assert_eq!(log_repo.logs().len(), 5);
    }

    #[tokio::test]
    async fn 送信失敗はタスク内で処理されpanicしない() {
        let log_repo = MockNotificationLogRepository::new();
        let dispatcher = make_dispatcher(MockNotificationSender::failing(), log_repo.clone(), 1);

        let result = dispatcher.dispatch(simple(1)).await;

        assert!(result.is_ok());
        assert_eq!(log_repo.logs().len(), 1);
    }

    #[test]
    fn 同時実行数0は1に切り上げる() {
        let dispatcher = make_dispatcher(
            MockNotificationSender::new(),
            MockNotificationLogRepository::new(),
            0,
        );

        assert_eq!(dispatcher.semaphore.available_permits(), 1);
    }
}
