//! # ページネーション付きレスポンス
//!
//! 1 始まりのページ番号によるオフセット型ページネーション。

use serde::{Deserialize, Serialize};

/// ページ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 現在のページ（1 始まり）
    pub page:        u32,
    /// 1 ページあたりの件数
    pub limit:       u32,
    /// 条件に一致する総件数
    pub total:       i64,
    /// 総ページ数（総件数 0 のときは 0）
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i64 = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        }
    }
}

/// ページネーション付きレスポンス
///
/// ## JSON 形式
///
/// ```json
/// {
///   "data": [...],
///   "pagination": { "page": 1, "limit": 10, "total": 42, "total_pages": 5 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data:       Vec<T>,
    pub pagination: PageInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: PageInfo) -> Self {
        Self { data, pagination }
    }
}
