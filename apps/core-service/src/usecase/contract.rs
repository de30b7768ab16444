//! # 契約ユースケース
//!
//! 運行会社の契約申請（作成・更新）と管理者による審査を扱う。
//!
//! ## 設計方針
//!
//! - **副作用の順序**: 入力検証とステータスチェックを先に済ませてからライセンスファイルをアップロードする
//! - **補償処理**: アップロード後に永続化が失敗した場合、アップロード済みのファイルを削除する
//! - **承認とプロビジョニング**: ステータス更新をトランザクション内で行い、プロビジョニング成功後にコミットする。
//!   失敗時はドロップでロールバックし、契約は審査前の状態のまま残る

use std::{str::FromStr, sync::Arc};

use busify_domain::{
    clock::Clock,
    contract::{
        Contract,
        ContractDetails,
        ContractId,
        ContractPeriod,
        ContractStatus,
        NewContract,
        ReviewAction,
    },
    value_objects::{Actor, Address, AdminNote, Email, OperationArea, PhoneNumber, VatCode},
};
use busify_infra::{
    db::{TransactionManager, TxContext},
    provisioning::OperatorProvisioner,
    repository::{ContractFilter, ContractPage, ContractRepository, PageRequest},
    s3::ObjectStorage,
};
use busify_shared::{event_log::event, log_business_event};
use chrono::NaiveDate;

use crate::{
    error::CoreError,
    usecase::helpers::{FindResultExt, SaveResultExt},
};

/// ライセンスファイルの保存先フォルダ
const LICENSE_FOLDER: &str = "licenses";

/// 1 ページあたりの最大件数
pub const MAX_PAGE_LIMIT: u32 = 100;

/// アップロードするライセンスファイル
#[derive(Debug, Clone)]
pub struct LicenseFile {
    pub filename:     String,
    pub content_type: String,
    pub data:         Vec<u8>,
}

/// 契約内容の入力
#[derive(Debug, Clone)]
pub struct ContractInput {
    pub email:          String,
    pub phone:          String,
    pub address:        String,
    pub vat_code:       String,
    pub operation_area: String,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
}

impl ContractInput {
    fn into_details(self) -> Result<ContractDetails, CoreError> {
        Ok(ContractDetails {
            email:          Email::new(self.email)?,
            phone:          PhoneNumber::new(self.phone)?,
            address:        Address::new(self.address)?,
            vat_code:       VatCode::new(self.vat_code)?,
            operation_area: OperationArea::new(self.operation_area)?,
            period:         ContractPeriod::new(self.start_date, self.end_date)?,
        })
    }
}

/// 契約作成の入力
#[derive(Debug, Clone)]
pub struct CreateContractInput {
    pub contract: ContractInput,
    pub license:  Option<LicenseFile>,
    pub actor:    String,
}

/// 契約更新の入力
#[derive(Debug, Clone)]
pub struct UpdateContractInput {
    pub contract_id: ContractId,
    pub contract:    ContractInput,
    /// 指定した場合のみライセンスファイルを差し替える
    pub license:     Option<LicenseFile>,
    pub actor:       String,
}

/// 審査の入力
#[derive(Debug, Clone)]
pub struct ReviewContractInput {
    pub contract_id: ContractId,
    /// `APPROVE` / `REJECT` / `REQUEST_REVISION`（大文字小文字を区別しない）
    pub action:      String,
    pub admin_note:  Option<String>,
    pub actor:       String,
}

/// 一覧取得の入力
#[derive(Debug, Clone)]
pub struct ListContractsInput {
    pub page:           u32,
    pub limit:          u32,
    pub status:         Option<String>,
    pub email:          Option<String>,
    pub operation_area: Option<String>,
}

/// 契約ユースケース
pub struct ContractUseCaseImpl {
    contract_repo: Arc<dyn ContractRepository>,
    tx_manager:    Arc<dyn TransactionManager>,
    storage:       Arc<dyn ObjectStorage>,
    provisioner:   Arc<dyn OperatorProvisioner>,
    clock:         Arc<dyn Clock>,
}

impl ContractUseCaseImpl {
    pub fn new(
        contract_repo: Arc<dyn ContractRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        storage: Arc<dyn ObjectStorage>,
        provisioner: Arc<dyn OperatorProvisioner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            contract_repo,
            tx_manager,
            storage,
            provisioner,
            clock,
        }
    }

    /// 契約を作成する
    ///
    /// 1. 入力を検証
    /// 2. ライセンスファイルがあればアップロード
    /// 3. PENDING の契約を挿入
    pub async fn create_contract(&self, input: CreateContractInput) -> Result<Contract, CoreError> {
        let details = input.contract.into_details()?;
        let actor = Actor::new(input.actor)?;

        let license_url = match &input.license {
            Some(file) => Some(self.upload_license(file).await?),
            None => None,
        };

        let contract = Contract::new(NewContract {
            id: ContractId::new(),
            details,
            license_url: license_url.clone(),
            actor,
            now: self.clock.now(),
        });

        let persisted = async {
            let mut tx = self.begin_tx().await?;
            self.contract_repo.insert(&mut tx, &contract).await?;
            self.commit_tx(tx).await
        }
        .await;

        if let Err(e) = persisted {
            if let Some(url) = license_url {
                self.discard_license(&url).await;
            }
            return Err(e);
        }

        log_business_event!(
            event.category = event::category::CONTRACT,
            event.action = event::action::CONTRACT_CREATED,
            event.entity_type = event::entity_type::CONTRACT,
            event.entity_id = %contract.id(),
            event.actor = %contract.created_by(),
            event.result = event::result::SUCCESS,
            "契約を作成"
        );

        Ok(contract)
    }

    /// 契約を取得する
    pub async fn get_contract(&self, id: &ContractId) -> Result<Contract, CoreError> {
        self.contract_repo.find_by_id(id).await.or_not_found("契約")
    }

    /// 契約一覧をページ単位で取得する（新しい順）
    ///
    /// フィルタ未指定の場合は全件が対象。
    pub async fn list_contracts(&self, input: ListContractsInput) -> Result<ContractPage, CoreError> {
        if input.page < 1 {
            return Err(CoreError::BadRequest(
                "page は 1 以上である必要があります".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&input.limit) {
            return Err(CoreError::BadRequest(format!(
                "limit は 1 以上 {MAX_PAGE_LIMIT} 以下である必要があります"
            )));
        }

        let status = input.status.as_deref().map(parse_status).transpose()?;
        let filter = ContractFilter {
            status,
            email: input.email,
            operation_area: input.operation_area,
        }
        .normalized();

        let page = PageRequest {
            page:  input.page,
            limit: input.limit,
        };

        Ok(self.contract_repo.find_page(&filter, page).await?)
    }

    /// 運行会社自身の契約一覧を取得する（新しい順）
    pub async fn list_contracts_by_email(&self, email: &str) -> Result<Vec<Contract>, CoreError> {
        let email = Email::new(email)?;
        Ok(self.contract_repo.find_by_email(&email).await?)
    }

    /// ステータスごとの件数を取得する
    pub async fn count_by_status(&self, status: &str) -> Result<i64, CoreError> {
        let status = parse_status(status)?;
        Ok(self.contract_repo.count_by_status(status).await?)
    }

    /// 契約を更新する
    ///
    /// PENDING / NEED_REVISION の契約のみ更新でき、更新後は常に PENDING に戻る。
    /// 新しいライセンスファイルが指定された場合は差し替え、コミット後に旧ファイルを削除する。
    pub async fn update_contract(&self, input: UpdateContractInput) -> Result<Contract, CoreError> {
        let contract = self.get_contract(&input.contract_id).await?;
        contract.ensure_editable()?;

        let details = input.contract.into_details()?;
        let actor = Actor::new(input.actor)?;

        let old_license_url = contract.license_url().map(String::from);
        let new_license_url = match &input.license {
            Some(file) => Some(self.upload_license(file).await?),
            None => None,
        };

        let expected_version = contract.version();
        let updated = contract.updated(details, new_license_url.clone(), actor, self.clock.now())?;

        let persisted = async {
            let mut tx = self.begin_tx().await?;
            self.contract_repo
                .update_with_version_check(&mut tx, &updated, expected_version)
                .await
                .or_conflict("契約")?;
            self.commit_tx(tx).await
        }
        .await;

        if let Err(e) = persisted {
            if let Some(url) = new_license_url {
                self.discard_license(&url).await;
            }
            return Err(e);
        }

        if let (Some(_), Some(url)) = (&new_license_url, old_license_url) {
            self.discard_license(&url).await;
        }

        log_business_event!(
            event.category = event::category::CONTRACT,
            event.action = event::action::CONTRACT_UPDATED,
            event.entity_type = event::entity_type::CONTRACT,
            event.entity_id = %updated.id(),
            event.actor = %updated.last_modified_by(),
            event.result = event::result::SUCCESS,
            "契約を更新"
        );

        Ok(updated)
    }

    /// 契約を審査する
    ///
    /// APPROVE の場合はトランザクション内でステータスを更新し、
    /// プロビジョニングが成功した場合のみコミットする。
    pub async fn review_contract(&self, input: ReviewContractInput) -> Result<Contract, CoreError> {
        let action = ReviewAction::from_str(&input.action)?;
        let admin_note = AdminNote::optional(input.admin_note)?;
        let actor = Actor::new(input.actor)?;

        let contract = self.get_contract(&input.contract_id).await?;
        let expected_version = contract.version();
        let reviewed = contract.reviewed(action, admin_note, actor, self.clock.now())?;

        let mut tx = self.begin_tx().await?;
        self.contract_repo
            .update_with_version_check(&mut tx, &reviewed, expected_version)
            .await
            .or_conflict("契約")?;

        if action == ReviewAction::Approve {
            self.provision(tx, &reviewed).await?;
        } else {
            self.commit_tx(tx).await?;
        }

        let action_name = match action {
            ReviewAction::Approve => event::action::CONTRACT_APPROVED,
            ReviewAction::Reject => event::action::CONTRACT_REJECTED,
            ReviewAction::RequestRevision => event::action::CONTRACT_REVISION_REQUESTED,
        };
        log_business_event!(
            event.category = event::category::CONTRACT,
            event.action = action_name,
            event.entity_type = event::entity_type::CONTRACT,
            event.entity_id = %reviewed.id(),
            event.actor = %reviewed.last_modified_by(),
            event.result = event::result::SUCCESS,
            "契約を審査"
        );

        Ok(reviewed)
    }

    /// プロビジョニングを呼び出し、成功した場合のみコミットする
    async fn provision(&self, tx: TxContext, contract: &Contract) -> Result<(), CoreError> {
        if let Err(e) = self.provisioner.provision(contract).await {
            drop(tx);
            log_business_event!(
                event.category = event::category::CONTRACT,
                event.action = event::action::OPERATOR_PROVISIONING_FAILED,
                event.entity_type = event::entity_type::CONTRACT,
                event.entity_id = %contract.id(),
                event.result = event::result::FAILURE,
                error = %e,
                "運行会社のプロビジョニングに失敗したため審査をロールバック"
            );
            return Err(CoreError::ProvisioningFailed {
                contract_id: contract.id().to_string(),
                email:       contract.email().to_string(),
                reason:      e.to_string(),
            });
        }

        self.commit_tx(tx).await
    }

    async fn upload_license(&self, file: &LicenseFile) -> Result<String, CoreError> {
        self.storage
            .upload(
                LICENSE_FOLDER,
                &file.filename,
                &file.content_type,
                file.data.clone(),
            )
            .await
            .map_err(|e| CoreError::UploadFailed {
                filename: file.filename.clone(),
                reason:   e.to_string(),
            })
    }

    /// 不要になったライセンスファイルを削除する（失敗はログのみ）
    async fn discard_license(&self, url: &str) {
        if let Err(e) = self.storage.delete_by_url(url).await {
            tracing::warn!(error = %e, url, "ライセンスファイルの削除に失敗");
        }
    }

    async fn begin_tx(&self) -> Result<TxContext, CoreError> {
        self.tx_manager
            .begin()
            .await
            .map_err(|e| CoreError::Internal(format!("トランザクション開始に失敗: {}", e)))
    }

    async fn commit_tx(&self, tx: TxContext) -> Result<(), CoreError> {
        tx.commit()
            .await
            .map_err(|e| CoreError::Internal(format!("トランザクションコミットに失敗: {}", e)))
    }
}

fn parse_status(value: &str) -> Result<ContractStatus, CoreError> {
    Ok(ContractStatus::from_str(value)?)
}
