//! # API レスポンスエンベロープ
//!
//! 内部 API の成功レスポンスを `{ "data": T }` 形式に揃える。

use serde::{Deserialize, Serialize};

/// 単一データ用のレスポンス型
///
/// ```
/// use busify_shared::ApiResponse;
///
/// let response = ApiResponse::new("PENDING");
/// assert_eq!(response.data, "PENDING");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_dataキーでラップしてシリアライズする() {
        let response = ApiResponse::new(serde_json::json!({ "status": "ACCEPTED" }));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "data": { "status": "ACCEPTED" } })
        );
    }

    #[test]
    fn test_core_serviceのレスポンスをデシリアライズできる() {
        let json = r#"{"data": 3}"#;
        let response: ApiResponse<i64> = serde_json::from_str(json).unwrap();

        assert_eq!(response.data, 3);
    }
}
