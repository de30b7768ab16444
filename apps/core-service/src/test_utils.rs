//! # テストユーティリティ
//!
//! 統合テストで契約ユースケースをインメモリのモックで組み立てる。

use std::sync::Arc;

use busify_domain::{clock::FixedClock, test_support::fixed_now};
use busify_infra::mock::{
    MockContractRepository,
    MockObjectStorage,
    MockOperatorProvisioner,
    MockTransactionManager,
};
use chrono::{DateTime, Utc};

use crate::usecase::ContractUseCaseImpl;

/// 組み立て済みのユースケースと、検証用に共有するモック
pub struct ContractTestSetup {
    pub sut:         ContractUseCaseImpl,
    pub repo:        MockContractRepository,
    pub tx_manager:  MockTransactionManager,
    pub storage:     MockObjectStorage,
    pub provisioner: MockOperatorProvisioner,
}

/// 契約ユースケースのテストビルダー
pub struct ContractTestBuilder {
    now:         DateTime<Utc>,
    storage:     MockObjectStorage,
    provisioner: MockOperatorProvisioner,
}

impl Default for ContractTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractTestBuilder {
    pub fn new() -> Self {
        Self {
            now:         fixed_now(),
            storage:     MockObjectStorage::new(),
            provisioner: MockOperatorProvisioner::new(),
        }
    }

    /// プロビジョニングが常に失敗する
    pub fn with_failing_provisioner(mut self) -> Self {
        self.provisioner = MockOperatorProvisioner::failing();
        self
    }

    /// アップロードが常に失敗する
    pub fn with_failing_upload(mut self) -> Self {
        self.storage = MockObjectStorage::failing_upload();
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn build(self) -> ContractTestSetup {
        let repo = MockContractRepository::new();
        let tx_manager = MockTransactionManager::for_contracts(&repo);
        let sut = ContractUseCaseImpl::new(
            Arc::new(repo.clone()),
            Arc::new(tx_manager.clone()),
            Arc::new(self.storage.clone()),
            Arc::new(self.provisioner.clone()),
            Arc::new(FixedClock::new(self.now)),
        );

        ContractTestSetup {
            sut,
            repo,
            tx_manager,
            storage: self.storage,
            provisioner: self.provisioner,
        }
    }
}
