//! メール本文と乗車券 PDF で共通の表示フォーマット（vi-VN）

use chrono::{DateTime, FixedOffset, Utc};
use itertools::Itertools;

/// ベトナム時間（UTC+07:00、夏時間なし）の秒オフセット
const VIETNAM_OFFSET_SECS: i32 = 7 * 3600;

/// 日時を `HH:MM dd/mm/YYYY`（ベトナム時間）で表示する
pub fn format_vn_datetime(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(VIETNAM_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format("%H:%M %d/%m/%Y").to_string(),
        None => at.format("%H:%M %d/%m/%Y").to_string(),
    }
}

/// 金額を `.` 区切りで表示する（例: `150000` → `150.000`）
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .join(".");

    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
