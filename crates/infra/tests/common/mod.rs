//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するエンティティ生成ヘルパー。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use busify_domain::{
    contract::{Contract, ContractDetails, ContractId, NewContract},
    test_support::contract_details,
    value_objects::Actor,
};
use busify_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{ContractRepository, PostgresContractRepository},
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// 基準日時（2025-01-15 03:00:00 UTC）
pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_736_910_000, 0).unwrap()
}

/// 基準日時から `minutes` 分後に作成された契約を組み立てる
pub fn new_contract(details: ContractDetails, minutes: i64) -> Contract {
    let email = details.email.as_str().to_string();
    Contract::new(NewContract {
        id: ContractId::new(),
        details,
        license_url: Some(format!("https://cdn.busify.vn/licenses/{email}.pdf")),
        actor: Actor::new(email).unwrap(),
        now: base_time() + Duration::minutes(minutes),
    })
}

/// 運行エリアを差し替えた契約内容
pub fn details_in_area(email: &str, area: &str) -> ContractDetails {
    ContractDetails {
        operation_area: busify_domain::value_objects::OperationArea::new(area).unwrap(),
        ..contract_details(email)
    }
}

/// 契約をトランザクション内で挿入してコミットする
pub async fn insert_contract(pool: &PgPool, contract: &Contract) {
    let repo = PostgresContractRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    repo.insert(&mut tx, contract).await.unwrap();
    tx.commit().await.unwrap();
}
