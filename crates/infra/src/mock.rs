//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! busify-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! ## トランザクションの再現
//!
//! [`MockContractRepository`] の書き込みはいったん保留され、
//! [`MockTransactionManager::for_contracts`] で払い出した `TxContext` のコミット時に確定する。
//! コミットせずにドロップすると保留分は次の `begin()` で破棄される（ロールバック相当）。

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use busify_domain::{
    contract::{Contract, ContractId, ContractStatus},
    notification::EmailMessage,
    value_objects::{Email, Version},
};

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    notification::{MailTransportError, NotificationSender},
    provisioning::OperatorProvisioner,
    repository::{
        ContractFilter,
        ContractPage,
        ContractRepository,
        NotificationLog,
        NotificationLogRepository,
        PageRequest,
    },
    s3::ObjectStorage,
};

// ===== MockTransactionManager =====

/// `TxContext` のモックを払い出すトランザクションマネージャ
#[derive(Clone, Default)]
pub struct MockTransactionManager {
    contracts: Option<MockContractRepository>,
    commits:   Arc<AtomicUsize>,
}

impl MockTransactionManager {
    /// 保留書き込みを持たないトランザクションマネージャ
    pub fn new() -> Self {
        Self::default()
    }

    /// コミット時に契約リポジトリの保留書き込みを確定するトランザクションマネージャ
    pub fn for_contracts(contracts: &MockContractRepository) -> Self {
        Self {
            contracts: Some(contracts.clone()),
            commits:   Arc::new(AtomicUsize::new(0)),
        }
    }

    /// コミットされた回数
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        let contracts = self.contracts.clone();
        if let Some(repo) = &contracts {
            repo.discard_staged();
        }
        let commits = self.commits.clone();
        Ok(TxContext::mock_with_commit_hook(move || {
            if let Some(repo) = contracts {
                repo.flush_staged();
            }
            commits.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// ===== MockContractRepository =====

/// インメモリの契約リポジトリ
///
/// 読み取りは確定済みの契約のみを返す。
#[derive(Clone, Default)]
pub struct MockContractRepository {
    contracts: Arc<Mutex<Vec<Contract>>>,
    staged:    Arc<Mutex<Vec<Contract>>>,
}

impl MockContractRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// テストデータを確定済みとして直接追加する
    pub fn add_contract(&self, contract: Contract) {
        self.contracts.lock().unwrap().push(contract);
    }

    /// 確定済みの契約を取得する
    pub fn snapshot(&self, id: &ContractId) -> Option<Contract> {
        self.contracts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    /// 確定済みの契約一覧
    pub fn all(&self) -> Vec<Contract> {
        self.contracts.lock().unwrap().clone()
    }

    fn stage(&self, contract: &Contract) {
        self.staged.lock().unwrap().push(contract.clone());
    }

    fn discard_staged(&self) {
        self.staged.lock().unwrap().clear();
    }

    fn flush_staged(&self) {
        let staged: Vec<Contract> = self.staged.lock().unwrap().drain(..).collect();
        let mut contracts = self.contracts.lock().unwrap();
        for contract in staged {
            match contracts.iter().position(|c| c.id() == contract.id()) {
                Some(pos) => contracts[pos] = contract,
                None => contracts.push(contract),
            }
        }
    }
}

#[async_trait]
impl ContractRepository for MockContractRepository {
    async fn insert(&self, _tx: &mut TxContext, contract: &Contract) -> Result<(), InfraError> {
        self.stage(contract);
        Ok(())
    }

    async fn update_with_version_check(
        &self,
        _tx: &mut TxContext,
        contract: &Contract,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        match self.snapshot(contract.id()) {
            Some(current) if current.version() == expected_version => {
                self.stage(contract);
                Ok(())
            }
            _ => Err(InfraError::conflict(
                "Contract",
                contract.id().as_uuid().to_string(),
            )),
        }
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, InfraError> {
        Ok(self.snapshot(id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Vec<Contract>, InfraError> {
        let mut found: Vec<Contract> = self
            .all()
            .into_iter()
            .filter(|c| c.email().as_str().eq_ignore_ascii_case(email.as_str()))
            .collect();
        found.sort_by_key(|c| std::cmp::Reverse(c.created_at()));
        Ok(found)
    }

    async fn find_page(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<ContractPage, InfraError> {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        let mut matched: Vec<Contract> = self
            .all()
            .into_iter()
            .filter(|c| filter.status.is_none_or(|s| c.status() == s))
            .filter(|c| contains(c.email().as_str(), &filter.email))
            .filter(|c| {
                contains(
                    c.details().operation_area.as_str(),
                    &filter.operation_area,
                )
            })
            .collect();
        matched.sort_by_key(|c| std::cmp::Reverse(c.created_at()));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(ContractPage { items, total })
    }

    async fn count_by_status(&self, status: ContractStatus) -> Result<i64, InfraError> {
        Ok(self
            .all()
            .iter()
            .filter(|c| c.status() == status)
            .count() as i64)
    }
}

// ===== MockObjectStorage =====

/// インメモリのオブジェクトストレージ
///
/// アップロード URL は `mock://{folder}/{n}-{filename}`。
#[derive(Clone, Default)]
pub struct MockObjectStorage {
    objects:     Arc<Mutex<Vec<String>>>,
    deleted:     Arc<Mutex<Vec<String>>>,
    fail_upload: bool,
    fail_delete: bool,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// アップロードが常に失敗するストレージ
    pub fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Self::default()
        }
    }

    /// 削除が常に失敗するストレージ
    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    /// 現在保存されている URL 一覧
    pub fn objects(&self) -> Vec<String> {
        self.objects.lock().unwrap().clone()
    }

    /// 削除された URL 一覧
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<String, InfraError> {
        if self.fail_upload {
            return Err(InfraError::s3("アップロード失敗（モック）"));
        }
        let mut objects = self.objects.lock().unwrap();
        let url = format!("mock://{folder}/{}-{filename}", objects.len() + 1);
        objects.push(url.clone());
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), InfraError> {
        if self.fail_delete {
            return Err(InfraError::s3("削除失敗（モック）"));
        }
        self.objects.lock().unwrap().retain(|u| u != url);
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ===== MockOperatorProvisioner =====

/// 呼び出しを記録するプロビジョニング
#[derive(Clone, Default)]
pub struct MockOperatorProvisioner {
    provisioned: Arc<Mutex<Vec<ContractId>>>,
    fail:        bool,
}

impl MockOperatorProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に失敗するプロビジョニング
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn provisioned(&self) -> Vec<ContractId> {
        self.provisioned.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperatorProvisioner for MockOperatorProvisioner {
    async fn provision(&self, contract: &Contract) -> Result<(), InfraError> {
        if self.fail {
            return Err(InfraError::provisioning("503 Service Unavailable（モック）"));
        }
        self.provisioned.lock().unwrap().push(contract.id().clone());
        Ok(())
    }
}

// ===== MockNotificationSender =====

/// 送信内容を記録する NotificationSender
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail: bool,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に失敗する送信
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailTransportError> {
        if self.fail {
            return Err(MailTransportError::new("SMTP 接続失敗（モック）"));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockNotificationLogRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationLogRepository {
    logs: Arc<Mutex<Vec<NotificationLog>>>,
    fail: bool,
}

impl MockNotificationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に記録に失敗するリポジトリ
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn logs(&self) -> Vec<NotificationLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationLogRepository for MockNotificationLogRepository {
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        if self.fail {
            return Err(InfraError::unexpected("notification_logs への INSERT 失敗（モック）"));
        }
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}
