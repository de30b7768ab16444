//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換など、複数のユースケースで繰り返されるパターンを共通化する。

use busify_infra::{InfraError, InfraErrorKind};

use crate::error::CoreError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// ```ignore
/// let contract = self.contract_repo.find_by_id(&id).await.or_not_found("契約")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合は `CoreError::Database` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
        self?
            .ok_or_else(|| CoreError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

/// version check 付き書き込みの結果を変換する
pub(crate) trait SaveResultExt {
    /// `Conflict` は `CoreError::Conflict`、それ以外は `CoreError::Database` に変換する
    fn or_conflict(self, entity_name: &str) -> Result<(), CoreError>;
}

impl SaveResultExt for Result<(), InfraError> {
    fn or_conflict(self, entity_name: &str) -> Result<(), CoreError> {
        self.map_err(|e| match e.kind() {
            InfraErrorKind::Conflict { .. } => CoreError::Conflict(format!(
                "{}は既に更新されています。最新の情報を取得してください。",
                entity_name
            )),
            _ => CoreError::Database(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === FindResultExt ===

    #[test]
    fn test_or_not_found_ok_some_は値を返す() {
        let result: Result<Option<i32>, InfraError> = Ok(Some(42));

        let value = result.or_not_found("テスト").unwrap();

        assert_eq!(value, 42);
    }

    #[test]
    fn test_or_not_found_ok_none_はnotfoundエラーを返す() {
        let result: Result<Option<i32>, InfraError> = Ok(None);

        let err = result.or_not_found("契約").unwrap_err();

        match err {
            CoreError::NotFound(msg) => {
                assert_eq!(msg, "契約が見つかりません");
            }
            other => panic!("NotFound を期待したが {:?} を受信", other),
        }
    }

    #[test]
    fn test_or_not_found_errはdatabaseエラーを返す() {
        let result: Result<Option<i32>, InfraError> = Err(InfraError::unexpected("接続失敗"));

        let err = result.or_not_found("契約").unwrap_err();

        assert!(matches!(err, CoreError::Database(_)));
    }

    // === SaveResultExt ===

    #[test]
    fn test_or_conflict_競合はconflictエラーを返す() {
        let result: Result<(), InfraError> = Err(InfraError::conflict("Contract", "c-1"));

        let err = result.or_conflict("契約").unwrap_err();

        match err {
            CoreError::Conflict(msg) => {
                assert!(msg.starts_with("契約は既に更新されています"));
            }
            other => panic!("Conflict を期待したが {:?} を受信", other),
        }
    }

    #[test]
    fn test_or_conflict_その他のエラーはdatabaseエラーを返す() {
        let result: Result<(), InfraError> = Err(InfraError::unexpected("deadlock"));

        assert!(matches!(
            result.or_conflict("契約"),
            Err(CoreError::Database(_))
        ));
    }
}
