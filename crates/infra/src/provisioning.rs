//! # 運行会社プロビジョニング
//!
//! 承認された契約をもとに、運行会社アカウントの作成を別サービスへ依頼する。
//!
//! - [`HttpOperatorProvisioner`]: `POST {base_url}/internal/operators` を呼び出す
//! - [`NoopOperatorProvisioner`]: 連携先未設定時。ログ出力のみ

use std::time::Duration;

use async_trait::async_trait;
use busify_domain::contract::Contract;
use serde::Serialize;
use uuid::Uuid;

use crate::InfraError;

/// プロビジョニング依頼のリクエストボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOperatorRequest {
    pub contract_id:    Uuid,
    pub email:          String,
    pub phone:          String,
    pub address:        String,
    pub vat_code:       String,
    pub operation_area: String,
}

impl ProvisionOperatorRequest {
    pub fn from_contract(contract: &Contract) -> Self {
        let details = contract.details();
        Self {
            contract_id:    *contract.id().as_uuid(),
            email:          details.email.as_str().to_string(),
            phone:          details.phone.as_str().to_string(),
            address:        details.address.as_str().to_string(),
            vat_code:       details.vat_code.as_str().to_string(),
            operation_area: details.operation_area.as_str().to_string(),
        }
    }
}

/// 運行会社プロビジョニングのインターフェース
#[async_trait]
pub trait OperatorProvisioner: Send + Sync {
    /// 承認済み契約の運行会社アカウントを作成する
    ///
    /// 2xx 以外のレスポンスと通信エラーはすべて失敗として扱う。
    async fn provision(&self, contract: &Contract) -> Result<(), InfraError>;
}

/// HTTP 経由のプロビジョニング実装
#[derive(Clone)]
pub struct HttpOperatorProvisioner {
    base_url: String,
    client:   reqwest::Client,
}

impl HttpOperatorProvisioner {
    /// # 引数
    ///
    /// - `base_url`: 運行会社管理サービスのベース URL（例: `http://localhost:13002`）
    /// - `timeout`: 1 回の呼び出し全体のタイムアウト。承認トランザクションはこの間開いたままになる
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                InfraError::provisioning(format!("HTTP クライアントの初期化に失敗: {e}"))
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl OperatorProvisioner for HttpOperatorProvisioner {
    #[tracing::instrument(skip_all, fields(contract_id = %contract.id()))]
    async fn provision(&self, contract: &Contract) -> Result<(), InfraError> {
        let url = format!("{}/internal/operators", self.base_url);
        let body = ProvisionOperatorRequest::from_contract(contract);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| InfraError::provisioning(format!("通信エラー: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(InfraError::provisioning(format!(
            "予期しないステータス {status}: {body}"
        )))
    }
}

/// Noop プロビジョニング（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopOperatorProvisioner;

#[async_trait]
impl OperatorProvisioner for NoopOperatorProvisioner {
    async fn provision(&self, contract: &Contract) -> Result<(), InfraError> {
        tracing::info!(
            contract_id = %contract.id(),
            "Noop: 運行会社プロビジョニングをスキップ"
        );
        Ok(())
    }
}
