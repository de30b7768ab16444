//! # 通知
//!
//! 乗客・運行会社向けメール通知のドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`Notification`] | 通知 | 送信内容（宛先と差し込みデータ）を持つ通知イベント |
//! | [`NotificationKind`] | 通知種別 | 9 種類。notification_logs の `kind` カラムに格納 |
//! | [`EmailMessage`] | メールメッセージ | テンプレートレンダリングの出力 |
//! | [`TicketInfo`] | 乗車券情報 | 乗車券確認メール・PDF の差し込みデータ |
//!
//! ## 設計方針
//!
//! - **enum による通知**: バリアントごとに必要な差し込みデータを型で表す
//! - **fire-and-forget**: 送信失敗は呼び出し元に返さず、ログと通知ログに残す
//! - **レンダリング分離**: メール本文と PDF の生成は core-service が担う

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{DomainError, value_objects::Email};

define_uuid_id! {
    /// 通知ログ ID
    ///
    /// notification_logs テーブルの主キー。
    pub struct NotificationLogId;
}

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗（リトライしない）
    #[error("{kind} の送信に失敗: {reason}")]
    SendFailed {
        kind:   NotificationKind,
        reason: String,
    },

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// 添付 PDF の生成に失敗
    #[error("乗車券 PDF の生成に失敗: {0}")]
    DocumentFailed(String),

    /// 通知ログの記録に失敗
    #[error("通知ログの記録に失敗: {0}")]
    LogFailed(String),
}

/// 通知種別
///
/// notification_logs テーブルでは snake_case、API パスでは kebab-case で表す。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Verification,
    PasswordReset,
    TicketConfirmation,
    TicketCancelled,
    BookingCancelled,
    BookingUpdated,
    ComplaintStatus,
    CustomerSupport,
    Simple,
}

impl NotificationKind {
    /// API パス上の表記（`ticket-confirmation` など）からパースする
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        segment.replace('-', "_").parse().ok()
    }
}

/// 添付ファイル
#[derive(Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename:     String,
    pub content_type: String,
    pub data:         Vec<u8>,
}

impl std::fmt::Debug for EmailAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAttachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:          String,
    /// 件名
    pub subject:     String,
    /// HTML 本文
    pub html_body:   String,
    /// プレーンテキスト本文
    pub text_body:   String,
    /// 添付ファイル（乗車券 PDF など）
    pub attachments: Vec<EmailAttachment>,
}

/// 便の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripInfo {
    pub start_location:         String,
    pub end_location:           String,
    pub departure_time:         DateTime<Utc>,
    pub estimated_arrival_time: DateTime<Utc>,
    pub license_plate:          String,
}

/// 乗車券情報
///
/// 価格は VND の整数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub ticket_code:     String,
    pub seat_number:     String,
    pub price:           i64,
    pub passenger_phone: String,
    pub booking_code:    String,
    pub trip:            TripInfo,
}

/// 乗車券の要約（キャンセル・変更通知用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub ticket_code: String,
    pub seat_number: String,
}

/// 通知
#[derive(Debug, Clone)]
pub enum Notification {
    /// メールアドレス確認
    Verification {
        to:        Email,
        full_name: String,
        token:     String,
    },
    /// パスワード再設定
    PasswordReset {
        to:        Email,
        full_name: String,
        token:     String,
    },
    /// 乗車券確認（PDF 添付）
    TicketConfirmation {
        to:        Email,
        full_name: String,
        tickets:   Vec<TicketInfo>,
    },
    /// 乗車券キャンセル
    TicketCancelled {
        to:          Email,
        full_name:   String,
        ticket_code: String,
    },
    /// 予約キャンセル
    BookingCancelled {
        to:        Email,
        full_name: String,
        tickets:   Vec<TicketSummary>,
    },
    /// 予約変更
    BookingUpdated {
        to:        Email,
        full_name: String,
        tickets:   Vec<TicketSummary>,
    },
    /// 苦情対応状況
    ComplaintStatus {
        to:                Email,
        full_name:         String,
        complaint_status:  String,
        complaint_content: String,
    },
    /// カスタマーサポートからの返信
    CustomerSupport {
        to:          Email,
        full_name:   String,
        subject:     String,
        message:     String,
        case_number: Option<String>,
        cs_rep_name: String,
    },
    /// 任意の件名・本文
    Simple {
        to:      Email,
        subject: String,
        content: String,
    },
}

impl Notification {
    /// 通知種別を返す
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Verification { .. } => NotificationKind::Verification,
            Self::PasswordReset { .. } => NotificationKind::PasswordReset,
            Self::TicketConfirmation { .. } => NotificationKind::TicketConfirmation,
            Self::TicketCancelled { .. } => NotificationKind::TicketCancelled,
            Self::BookingCancelled { .. } => NotificationKind::BookingCancelled,
            Self::BookingUpdated { .. } => NotificationKind::BookingUpdated,
            Self::ComplaintStatus { .. } => NotificationKind::ComplaintStatus,
            Self::CustomerSupport { .. } => NotificationKind::CustomerSupport,
            Self::Simple { .. } => NotificationKind::Simple,
        }
    }

    /// 受信者のメールアドレスを返す
    pub fn recipient(&self) -> &Email {
        match self {
            Self::Verification { to, .. }
            | Self::PasswordReset { to, .. }
            | Self::TicketConfirmation { to, .. }
            | Self::TicketCancelled { to, .. }
            | Self::BookingCancelled { to, .. }
            | Self::BookingUpdated { to, .. }
            | Self::ComplaintStatus { to, .. }
            | Self::CustomerSupport { to, .. }
            | Self::Simple { to, .. } => to,
        }
    }

    /// 送信キューに積む前の入力チェック
    ///
    /// 乗車券確認は PDF を 1 枚目の乗車券から組み立てるため、空の一覧を受け付けない。
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::TicketConfirmation { tickets, .. } if tickets.is_empty() => Err(
                DomainError::Validation("乗車券が 1 枚も指定されていません".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
