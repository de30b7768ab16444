//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成、マイグレーション、トランザクション境界を提供する。
//!
//! ## 設計方針
//!
//! - **接続プール**: 起動時に一度だけ作成し、アプリケーション全体で共有する
//! - **TxContext**: 書き込みリポジトリメソッドの必須引数。トランザクションなしの書き込みを
//!   コンパイルエラーにする
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use busify_infra::db;
//!
//! let pool = db::create_pool("postgres://localhost/busify").await?;
//! db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

/// データベースマイグレーションを実行する
///
/// 適用済みのマイグレーションはスキップされる。sqlx が advisory lock を取るため、
/// 複数プロセスから同時に呼び出してもよい。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL 接続プールを作成する
///
/// - `max_connections(10)`: 最大接続数
/// - `acquire_timeout(5秒)`: 接続取得のタイムアウト
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// 疎通確認（readiness 用）
pub async fn ping(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

// =============================================================================
// TxContext
// =============================================================================

/// トランザクションコンテキスト
///
/// # ライフサイクル
///
/// 1. `TransactionManager::begin()` で作成
/// 2. 書き込みメソッドに `&mut TxContext` として渡す
/// 3. `commit()` でコミット、またはドロップでロールバック
pub struct TxContext(TxContextInner);

enum TxContextInner {
    Pg(Transaction<'static, Postgres>),
    /// コミット時に呼ばれるフックを持つ
    #[cfg(any(test, feature = "test-utils"))]
    Mock(Option<Box<dyn FnOnce() + Send>>),
}

impl TxContext {
    pub(crate) async fn begin_pg(pool: &PgPool) -> Result<Self, InfraError> {
        Ok(Self(TxContextInner::Pg(pool.begin().await?)))
    }

    /// テスト用のモック TxContext を作成する
    ///
    /// `conn()` を呼ぶと panic する。Mock リポジトリは `conn()` を使用しない。
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self(TxContextInner::Mock(None))
    }

    /// コミット時にフックを呼ぶモック TxContext を作成する
    ///
    /// フックを呼ばずにドロップした場合はロールバック扱い。
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock_with_commit_hook(hook: impl FnOnce() + Send + 'static) -> Self {
        Self(TxContextInner::Mock(Some(Box::new(hook))))
    }

    /// トランザクションをコミットする
    ///
    /// 呼ばずにドロップすると、sqlx が自動的にロールバックする。
    pub async fn commit(self) -> Result<(), InfraError> {
        match self.0 {
            TxContextInner::Pg(tx) => {
                tx.commit().await?;
                Ok(())
            }
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock(hook) => {
                if let Some(hook) = hook {
                    hook();
                }
                Ok(())
            }
        }
    }

    /// トランザクション内の DB コネクションを取得する
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match &mut self.0 {
            TxContextInner::Pg(tx) => tx,
            #[cfg(any(test, feature = "test-utils"))]
            TxContextInner::Mock(_) => {
                panic!("BUG: conn() called on Mock TxContext. Mock repos should not call conn().")
            }
        }
    }
}

// =============================================================================
// TransactionManager
// =============================================================================

/// トランザクション管理 trait
///
/// ユースケース層は PgPool に直接依存せず、この trait 経由でトランザクションを開始する。
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<TxContext, InfraError>;
}

/// Postgres 用 TransactionManager 実装
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        TxContext::begin_pg(&self.pool).await
    }
}

#[cfg(test)]
mod tx_context_tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_tx_contextはsendを実装している() {
        assert_send::<TxContext>();
    }

    #[test]
    fn test_transaction_manager_traitはsendとsyncを実装している() {
        assert_send_sync::<Box<dyn TransactionManager>>();
    }

    #[tokio::test]
    async fn test_モックのコミットでフックが呼ばれる() {
        use std::sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        };

        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let tx = TxContext::mock_with_commit_hook(move || flag.store(true, Ordering::SeqCst));

        tx.commit().await.unwrap();

        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_モックをドロップしてもフックは呼ばれない() {
        use std::sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        };

        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let tx = TxContext::mock_with_commit_hook(move || flag.store(true, Ordering::SeqCst));

        drop(tx);

        assert!(!called.load(Ordering::SeqCst));
    }
}
