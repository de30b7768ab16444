//! # 通知ハンドラ
//!
//! `POST /internal/notifications/{kind}` で通知をバックグラウンド送信のキューに積む。
//!
//! `kind` は kebab-case（`ticket-confirmation` など）。ボディの形は種別ごとに異なる。
//! 入力検証が通れば送信結果を待たずに `202 Accepted` を返す。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use busify_domain::{
    notification::{Notification, NotificationKind, TicketInfo, TicketSummary},
    value_objects::Email,
};
use busify_shared::ApiResponse;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{error::CoreError, usecase::NotificationDispatcher};

/// 通知 API の共有状態
pub struct NotificationState {
    pub dispatcher: NotificationDispatcher,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Deserialize)]
struct TokenRequest {
    to:        String,
    full_name: String,
    token:     String,
}

#[derive(Debug, Deserialize)]
struct TicketConfirmationRequest {
    to:        String,
    full_name: String,
    tickets:   Vec<TicketInfo>,
}

#[derive(Debug, Deserialize)]
struct TicketCancelledRequest {
    to:          String,
    full_name:   String,
    ticket_code: String,
}

#[derive(Debug, Deserialize)]
struct TicketListRequest {
    to:        String,
    full_name: String,
    tickets:   Vec<TicketSummary>,
}

#[derive(Debug, Deserialize)]
struct ComplaintStatusRequest {
    to:                String,
    full_name:         String,
    complaint_status:  String,
    complaint_content: String,
}

#[derive(Debug, Deserialize)]
struct CustomerSupportRequest {
    to:          String,
    full_name:   String,
    subject:     String,
    message:     String,
    case_number: Option<String>,
    cs_rep_name: String,
}

#[derive(Debug, Deserialize)]
struct SimpleRequest {
    to:      String,
    subject: String,
    content: String,
}

/// 受付結果 DTO
#[derive(Debug, Serialize)]
pub struct NotificationAcceptedDto {
    pub kind:   NotificationKind,
    pub status: &'static str,
}

// --- ハンドラ ---

/// POST /internal/notifications/{kind}
///
/// ## レスポンス
///
/// - `202 Accepted`: キューに積んだ
/// - `400 Bad Request`: ボディの形が不正、メールアドレス不正、乗車券が空
/// - `404 Not Found`: 未知の通知種別
#[tracing::instrument(skip_all, fields(kind = %kind))]
pub async fn send_notification(
    State(state): State<Arc<NotificationState>>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, CoreError> {
    let kind = NotificationKind::from_path_segment(&kind)
        .ok_or_else(|| CoreError::NotFound(format!("通知種別 {kind} は存在しません")))?;

    let notification = build_notification(kind, body)?;
    notification.validate()?;
    state.dispatcher.dispatch(notification);

    let response = ApiResponse::new(NotificationAcceptedDto {
        kind,
        status: "queued",
    });
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// ボディを種別ごとのリクエスト型として解釈し、通知を組み立てる
fn build_notification(kind: NotificationKind, body: Value) -> Result<Notification, CoreError> {
    let notification = match kind {
        NotificationKind::Verification => {
            let req: TokenRequest = parse(body)?;
            Notification::Verification {
                to:        Email::new(req.to)?,
                full_name: req.full_name,
                token:     req.token,
            }
        }
        NotificationKind::PasswordReset => {
            let req: TokenRequest = parse(body)?;
            Notification::PasswordReset {
                to:        Email::new(req.to)?,
                full_name: req.full_name,
                token:     req.token,
            }
        }
        NotificationKind::TicketConfirmation => {
            let req: TicketConfirmationRequest = parse(body)?;
            Notification::TicketConfirmation {
                to:        Email::new(req.to)?,
                full_name: req.full_name,
                tickets:   req.tickets,
            }
        }
        NotificationKind::TicketCancelled => {
            let req: TicketCancelledRequest = parse(body)?;
            Notification::TicketCancelled {
                to:          Email::new(req.to)?,
                full_name:   req.full_name,
                ticket_code: req.ticket_code,
            }
        }
        NotificationKind::BookingCancelled => {
            let req: TicketListRequest = parse(body)?;
            Notification::BookingCancelled {
                to:        Email::new(req.to)?,
                full_name: req.full_name,
                tickets:   req.tickets,
            }
        }
        NotificationKind::BookingUpdated => {
            let req: TicketListRequest = parse(body)?;
            Notification::BookingUpdated {
                to:        Email::new(req.to)?,
                full_name: req.full_name,
                tickets:   req.tickets,
            }
        }
        NotificationKind::ComplaintStatus => {
            let req: ComplaintStatusRequest = parse(body)?;
            Notification::ComplaintStatus {
                to:                Email::new(req.to)?,
                full_name:         req.full_name,
                complaint_status:  req.complaint_status,
                complaint_content: req.complaint_content,
            }
        }
        NotificationKind::CustomerSupport => {
            let req: CustomerSupportRequest = parse(body)?;
            Notification::CustomerSupport {
                to:          Email::new(req.to)?,
                full_name:   req.full_name,
                subject:     req.subject,
                message:     req.message,
                case_number: req.case_number,
                cs_rep_name: req.cs_rep_name,
            }
        }
        NotificationKind::Simple => {
            let req: SimpleRequest = parse(body)?;
            Notification::Simple {
                to:      Email::new(req.to)?,
                subject: req.subject,
                content: req.content,
            }
        }
    };
    Ok(notification)
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T, CoreError> {
    serde_json::from_value(body)
        .map_err(|e| CoreError::BadRequest(format!("リクエストボディが不正です: {e}")))
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::post};
    use busify_domain::{clock::FixedClock, test_support::fixed_now};
    use busify_infra::mock::{MockNotificationLogRepository, MockNotificationSender};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::usecase::{NotificationService, TemplateRenderer, TicketPdfRenderer};

    fn router(sender: MockNotificationSender) -> Router {
        let service = NotificationService::new(
            Arc::new(sender),
            TemplateRenderer::new().unwrap(),
            TicketPdfRenderer::builtin(),
            Arc::new(MockNotificationLogRepository::new()),
            Arc::new(FixedClock::new(fixed_now())),
            "http://localhost:5173".to_string(),
        );
        let dispatcher = NotificationDispatcher::new(Arc::new(service), 4);
        Router::new()
            .route("/internal/notifications/{kind}", post(send_notification))
            .with_state(Arc::new(NotificationState { dispatcher }))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// バックグラウンドタスクの送信完了を待つ
    async fn wait_for_sent(sender: &MockNotificationSender, expected: usize) {
        for _ in 0..100 {
            if sender.sent_emails().len() >= expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("{expected} 件の送信を待ったがタイムアウト");
    }

    #[tokio::test]
    async fn test_通知を受け付けると202でバックグラウンド送信する() {
        let sender = MockNotificationSender::new();

        let (status, json) = post_json(
            router(sender.clone()),
            "/internal/notifications/ticket-cancelled",
            json!({ "to": "khach@example.com", "full_name": "Nguyễn Văn A", "ticket_code": "TK-009" }),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(
            json["data"],
            json!({ "kind": "ticket_cancelled", "status": "queued" })
        );
        wait_for_sent(&sender, 1).await;
        assert_eq!(sender.sent_emails()[0].subject, "Thông báo hủy vé");
    }

    #[tokio::test]
    async fn test_乗車券確認はpdf付きで送信される() {
        let sender = MockNotificationSender::new();

        let (status, _) = post_json(
            router(sender.clone()),
            "/internal/notifications/ticket-confirmation",
            json!({
                "to": "khach@example.com",
                "full_name": "Trần Thị Bích",
                "tickets": [{
                    "ticket_code": "TK-001",
                    "seat_number": "A01",
                    "price": 250000,
                    "passenger_phone": "0912345678",
                    "booking_code": "BK-001",
                    "trip": {
                        "start_location": "Sài Gòn",
                        "end_location": "Đà Lạt",
                        "departure_time": "2025-01-15T03:00:00Z",
                        "estimated_arrival_time": "2025-01-15T11:00:00Z",
                        "license_plate": "51B-123.45"
                    }
                }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for_sent(&sender, 1).await;
        let sent = sender.sent_emails();
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "ve-xe-busify.pdf");
    }

    #[rstest]
    #[case::未知の種別("/internal/notifications/push", json!({}), StatusCode::NOT_FOUND)]
    #[case::必須項目の欠落(
        "/internal/notifications/simple",
        json!({ "to": "khach@example.com" }),
        StatusCode::BAD_REQUEST
    )]
    #[case::不正なメールアドレス(
        "/internal/notifications/simple",
        json!({ "to": "khach", "subject": "s", "content": "c" }),
        StatusCode::BAD_REQUEST
    )]
    #[case::乗車券なしの乗車券確認(
        "/internal/notifications/ticket-confirmation",
        json!({ "to": "khach@example.com", "full_name": "A", "tickets": [] }),
        StatusCode::BAD_REQUEST
    )]
    #[tokio::test]
    async fn test_不正なリクエストは送信しない(
        #[case] uri: &str,
        #[case] body: Value,
        #[case] expected: StatusCode,
    ) {
        let sender = MockNotificationSender::new();

        let (status, _) = post_json(router(sender.clone()), uri, body).await;

        assert_eq!(status, expected);
        assert!(sender.sent_emails().is_empty());
    }
}
