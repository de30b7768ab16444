//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **共通レイアウト**: HTML は `base.html` を継承し、自動送信の注記をフッターに置く
//! - **差し込み値は整形済みで渡す**: 金額・日時の vi-VN 表記は [`super::format`] で作る
//! - **添付なし**: 乗車券 PDF の添付は NotificationService が行う

use busify_domain::notification::{EmailMessage, Notification, NotificationError, TicketInfo};
use serde::Serialize;
use tera::{Context, Tera};

use super::format::{format_vn_datetime, format_vnd};

/// 乗車券カード 1 枚分の表示値
#[derive(Debug, Serialize)]
struct TicketCard<'a> {
    ticket_code:    &'a str,
    seat_number:    &'a str,
    price:          String,
    departure:      String,
    arrival:        String,
    start_location: &'a str,
    end_location:   &'a str,
    license_plate:  &'a str,
}

impl<'a> From<&'a TicketInfo> for TicketCard<'a> {
    fn from(ticket: &'a TicketInfo) -> Self {
        Self {
            ticket_code:    &ticket.ticket_code,
            seat_number:    &ticket.seat_number,
            price:          format_vnd(ticket.price),
            departure:      format_vn_datetime(ticket.trip.departure_time),
            arrival:        format_vn_datetime(ticket.trip.estimated_arrival_time),
            start_location: &ticket.trip.start_location,
            end_location:   &ticket.trip.end_location,
            license_plate:  &ticket.trip.license_plate,
        }
    }
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、`Notification` から
/// `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "base.html",
                    include_str!("../../../templates/notifications/base.html"),
                ),
                (
                    "verification.html",
                    include_str!("../../../templates/notifications/verification.html"),
                ),
                (
                    "verification.txt",
                    include_str!("../../../templates/notifications/verification.txt"),
                ),
                (
                    "password_reset.html",
                    include_str!("../../../templates/notifications/password_reset.html"),
                ),
                (
                    "password_reset.txt",
                    include_str!("../../../templates/notifications/password_reset.txt"),
                ),
                (
                    "ticket_confirmation.html",
                    include_str!("../../../templates/notifications/ticket_confirmation.html"),
                ),
                (
                    "ticket_confirmation.txt",
                    include_str!("../../../templates/notifications/ticket_confirmation.txt"),
                ),
                (
                    "ticket_cancelled.html",
                    include_str!("../../../templates/notifications/ticket_cancelled.html"),
                ),
                (
                    "ticket_cancelled.txt",
                    include_str!("../../../templates/notifications/ticket_cancelled.txt"),
                ),
                (
                    "booking_cancelled.html",
                    include_str!("../../../templates/notifications/booking_cancelled.html"),
                ),
                (
                    "booking_cancelled.txt",
                    include_str!("../../../templates/notifications/booking_cancelled.txt"),
                ),
                (
                    "booking_updated.html",
                    include_str!("../../../templates/notifications/booking_updated.html"),
                ),
                (
                    "booking_updated.txt",
                    include_str!("../../../templates/notifications/booking_updated.txt"),
                ),
                (
                    "complaint_status.html",
                    include_str!("../../../templates/notifications/complaint_status.html"),
                ),
                (
                    "complaint_status.txt",
                    include_str!("../../../templates/notifications/complaint_status.txt"),
                ),
                (
                    "customer_support.html",
                    include_str!("../../../templates/notifications/customer_support.html"),
                ),
                (
                    "customer_support.txt",
                    include_str!("../../../templates/notifications/customer_support.txt"),
                ),
                (
                    "simple.html",
                    include_str!("../../../templates/notifications/simple.html"),
                ),
                (
                    "simple.txt",
                    include_str!("../../../templates/notifications/simple.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// 通知からメールメッセージを生成する
    ///
    /// # 引数
    ///
    /// - `notification`: 通知
    /// - `frontend_url`: フロントエンドのベース URL（例: `http://localhost:5173`）
    pub fn render(
        &self,
        notification: &Notification,
        frontend_url: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let (subject, context) = build_template_params(notification, frontend_url);
        let template_name = notification.kind().to_string();

        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: notification.recipient().to_string(),
            subject,
            html_body,
            text_body,
            attachments: Vec::new(),
        })
    }
}

/// 件名とコンテキストを構築する
fn build_template_params(notification: &Notification, frontend_url: &str) -> (String, Context) {
    let mut context = Context::new();

    let subject = match notification {
        Notification::Verification {
            full_name, token, ..
        } => {
            context.insert("full_name", full_name);
            context.insert("link", &token_link(frontend_url, "verify-email", token));
            "Xác thực email của bạn".to_string()
        }
        Notification::PasswordReset {
            full_name, token, ..
        } => {
            context.insert("full_name", full_name);
            context.insert("link", &token_link(frontend_url, "reset-password", token));
            "Đặt lại mật khẩu".to_string()
        }
        Notification::TicketConfirmation {
            full_name, tickets, ..
        } => {
            let cards: Vec<TicketCard<'_>> = tickets.iter().map(TicketCard::from).collect();
            context.insert("full_name", full_name);
            context.insert("tickets", &cards);
            "Xác nhận đặt vé của bạn".to_string()
        }
        Notification::TicketCancelled {
            full_name,
            ticket_code,
            ..
        } => {
            context.insert("full_name", full_name);
            context.insert("ticket_code", ticket_code);
            "Thông báo hủy vé".to_string()
        }
        Notification::BookingCancelled {
            full_name, tickets, ..
        } => {
            context.insert("full_name", full_name);
            context.insert("tickets", tickets);
            "Thông báo hủy booking".to_string()
        }
        Notification::BookingUpdated {
            full_name, tickets, ..
        } => {
            context.insert("full_name", full_name);
            context.insert("tickets", tickets);
            "Thông báo cập nhật booking".to_string()
        }
        Notification::ComplaintStatus {
            full_name,
            complaint_status,
            complaint_content,
            ..
        } => {
            context.insert("full_name", full_name);
            context.insert("complaint_status", complaint_status);
            context.insert("complaint_content", complaint_content);
            "Thông báo về khiếu nại".to_string()
        }
        Notification::CustomerSupport {
            full_name,
            subject,
            message,
            case_number,
            cs_rep_name,
            ..
        } => {
            context.insert("full_name", full_name);
            context.insert("message", message);
            context.insert("case_number", case_number);
            context.insert("cs_rep_name", cs_rep_name);
            subject.clone()
        }
        Notification::Simple {
            subject, content, ..
        } => {
            context.insert("subject", subject);
            context.insert("content", content);
            subject.clone()
        }
    };

    (subject, context)
}

/// `{frontend_url}/{path}?token={token}` を組み立てる（トークンは URL エンコード）
fn token_link(frontend_url: &str, path: &str, token: &str) -> String {
    format!("{frontend_url}/{path}?token={}", urlencoding::encode(token))
}

#[cfg(test)]
mod tests {
    use busify_domain::{
        notification::{TicketSummary, TripInfo},
        value_objects::Email,
    };
    use chrono::DateTime;

    use super::*;

    const FRONTEND_URL: &str = "http://localhost:5173";

    fn email() -> Email {
        Email::new("khach@example.com").unwrap()
    }

    fn ticket(code: &str, seat: &str) -> TicketInfo {
        TicketInfo {
            ticket_code:     code.to_string(),
            seat_number:     seat.to_string(),
            price:           150_000,
            passenger_phone: "0912345678".to_string(),
            booking_code:    "BK-001".to_string(),
            trip:            TripInfo {
                start_location:         "Hà Nội".to_string(),
                end_location:           "Hải Phòng".to_string(),
                departure_time:         DateTime::from_timestamp(1_736_910_000, 0).unwrap(),
                estimated_arrival_time: DateTime::from_timestamp(1_736_973_000, 0).unwrap(),
                license_plate:          "29B-567.89".to_string(),
            },
        }
    }

    fn render(notification: &Notification) -> EmailMessage {
        TemplateRenderer::new()
            .unwrap()
            .render(notification, FRONTEND_URL)
            .unwrap()
    }

    #[test]
    fn newが正常に初期化される() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn verificationはトークンをエンコードしたリンクを含む() {
        let email = render(&Notification::Verification {
            to:        email(),
            full_name: "Nguyễn Văn A".to_string(),
            token:     "abc+def/=".to_string(),
        });

        assert_eq!(email.to, "khach@example.com");
        assert_eq!(email.subject, "Xác thực email của bạn");
        assert!(
            email
                .html_body
                .contains("http://localhost:5173/verify-email?token=abc%2Bdef%2F%3D")
        );
        assert!(email.html_body.contains("Nguyễn Văn A"));
        assert!(email.html_body.contains("24 giờ"));
        assert!(email.text_body.contains("verify-email?token=abc%2Bdef%2F%3D"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn password_resetはリセットリンクを含む() {
        let email = render(&Notification::PasswordReset {
            to:        email(),
            full_name: "Nguyễn Văn A".to_string(),
            token:     "tok123".to_string(),
        });

        assert_eq!(email.subject, "Đặt lại mật khẩu");
        assert!(
            email
                .html_body
                .contains("http://localhost:5173/reset-password?token=tok123")
        );
    }

    #[test]
    fn ticket_confirmationは乗車券ごとにカードを描画する() {
        let email = render(&Notification::TicketConfirmation {
            to:        email(),
            full_name: "Trần Thị Bích".to_string(),
            tickets:   vec![ticket("TK-001", "A01"), ticket("TK-002", "A02")],
        });

        assert_eq!(email.subject, "Xác nhận đặt vé của bạn");
        assert_eq!(email.html_body.matches("🎫 Mã vé:").count(), 2);
        assert!(email.html_body.contains("150.000 VND"));
        assert!(email.html_body.contains("10:00 15/01/2025"));
        assert!(email.html_body.contains("03:30 16/01/2025"));
        assert!(email.html_body.contains("29B-567.89"));
        assert!(email.html_body.contains("File PDF với QR code"));
        assert!(email.text_body.contains("TK-002"));
    }

    #[test]
    fn ticket_cancelledは乗車券コードを含む() {
        let email = render(&Notification::TicketCancelled {
            to:          email(),
            full_name:   "Nguyễn Văn A".to_string(),
            ticket_code: "TK-009".to_string(),
        });

        assert_eq!(email.subject, "Thông báo hủy vé");
        assert!(
            email
                .html_body
                .contains("Vé với mã <strong>TK-009</strong> đã bị hủy")
        );
    }

    #[test]
    fn booking_cancelledは乗車券一覧を列挙する() {
        let email = render(&Notification::BookingCancelled {
            to:        email(),
            full_name: "Nguyễn Văn A".to_string(),
            tickets:   vec![
                TicketSummary {
                    ticket_code: "TK-001".to_string(),
                    seat_number: "A01".to_string(),
                },
                TicketSummary {
                    ticket_code: "TK-002".to_string(),
                    seat_number: "A02".to_string(),
                },
            ],
        });

        assert_eq!(email.subject, "Thông báo hủy booking");
        assert!(email.html_body.contains("<li>Mã vé: TK-001, Số ghế: A01</li>"));
        assert!(email.html_body.contains("<li>Mã vé: TK-002, Số ghế: A02</li>"));
    }

    #[test]
    fn booking_updatedの件名() {
        let email = render(&Notification::BookingUpdated {
            to:        email(),
            full_name: "Nguyễn Văn A".to_string(),
            tickets:   vec![TicketSummary {
                ticket_code: "TK-010".to_string(),
                seat_number: "B05".to_string(),
            }],
        });

        assert_eq!(email.subject, "Thông báo cập nhật booking");
        assert!(email.text_body.contains("Mã vé: TK-010, Số ghế: B05"));
    }

    #[test]
    fn complaint_statusは状態と内容を含む() {
        let email = render(&Notification::ComplaintStatus {
            to:                email(),
            full_name:         "Nguyễn Văn A".to_string(),
            complaint_status:  "Đã giải quyết".to_string(),
            complaint_content: "Xe khởi hành trễ 2 tiếng".to_string(),
        });

        assert_eq!(email.subject, "Thông báo về khiếu nại");
        assert!(email.html_body.contains("<strong>Đã giải quyết</strong>"));
        assert!(email.html_body.contains("Xe khởi hành trễ 2 tiếng"));
    }

    #[test]
    fn customer_supportは改行をbrに変換しhtmlをエスケープする() {
        let email = render(&Notification::CustomerSupport {
            to:          email(),
            full_name:   "Nguyễn Văn A".to_string(),
            subject:     "Phản hồi yêu cầu hỗ trợ".to_string(),
            message:     "Dòng 1\nDòng 2 <b>".to_string(),
            case_number: Some("CS-42".to_string()),
            cs_rep_name: "Phạm Minh".to_string(),
        });

        assert_eq!(email.subject, "Phản hồi yêu cầu hỗ trợ");
        assert!(email.html_body.contains("Dòng 1<br>Dòng 2 &lt;b&gt;"));
        assert!(email.html_body.contains("Mã tham chiếu:</strong> CS-42"));
        assert!(email.html_body.contains("Phạm Minh"));
        assert!(email.text_body.contains("Dòng 1\nDòng 2 <b>"));
    }

    #[test]
    fn customer_supportで参照番号がなければ表示しない() {
        let email = render(&Notification::CustomerSupport {
            to:          email(),
            full_name:   "Nguyễn Văn A".to_string(),
            subject:     "Hỗ trợ".to_string(),
            message:     "Xin chào".to_string(),
            case_number: None,
            cs_rep_name: "Phạm Minh".to_string(),
        });

        assert!(!email.html_body.contains("Mã tham chiếu"));
        assert!(!email.text_body.contains("Mã tham chiếu"));
    }

    #[test]
    fn simpleは呼び出し元の件名と本文を使う() {
        let email = render(&Notification::Simple {
            to:      email(),
            subject: "Khuyến mãi tháng 10".to_string(),
            content: "Giảm 10%\ncho mọi tuyến".to_string(),
        });

        assert_eq!(email.subject, "Khuyến mãi tháng 10");
        assert!(email.html_body.contains("Giảm 10%<br>cho mọi tuyến"));
        assert!(email.html_body.contains("Email này được gửi tự động"));
    }
}
