//! テスト用のエンティティ生成ヘルパー
//!
//! 他クレートのテストから `features = ["test-support"]` で利用する。

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    contract::{
        Contract,
        ContractDetails,
        ContractId,
        ContractPeriod,
        ContractRecord,
        ContractStatus,
        NewContract,
    },
    value_objects::{Actor, Address, Email, OperationArea, PhoneNumber, VatCode},
};

/// テスト用の固定日時（2025-01-15 03:00:00 UTC）
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_736_910_000, 0).unwrap()
}

/// 指定メールアドレスの契約内容
pub fn contract_details(email: &str) -> ContractDetails {
    ContractDetails {
        email:          Email::new(email).unwrap(),
        phone:          PhoneNumber::new("0901234567").unwrap(),
        address:        Address::new("80 Trần Hưng Đạo, Quận 1, TP.HCM").unwrap(),
        vat_code:       VatCode::new("0301234567").unwrap(),
        operation_area: OperationArea::new("TP.HCM - Đà Lạt").unwrap(),
        period:         ContractPeriod::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        )
        .unwrap(),
    }
}

/// PENDING の契約
pub fn pending_contract(email: &str) -> Contract {
    Contract::new(NewContract {
        id:          ContractId::new(),
        details:     contract_details(email),
        license_url: None,
        actor:       Actor::new(email).unwrap(),
        now:         fixed_now(),
    })
}

/// 指定ステータスの契約
///
/// ACCEPTED の場合は `fixed_now()` を承認日時とする。
pub fn contract_in_status(email: &str, status: ContractStatus) -> Contract {
    let contract = pending_contract(email);
    Contract::from_db(ContractRecord {
        id: contract.id().clone(),
        details: contract.details().clone(),
        license_url: contract.license_url().map(String::from),
        status,
        admin_note: None,
        approved_at: (status == ContractStatus::Accepted).then(fixed_now),
        version: contract.version(),
        created_by: contract.created_by().clone(),
        last_modified_by: contract.last_modified_by().clone(),
        created_at: contract.created_at(),
        updated_at: contract.updated_at(),
    })
    .unwrap()
}
