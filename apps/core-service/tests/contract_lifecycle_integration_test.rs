//! 契約ライフサイクルの統合テスト
//!
//! 作成 → 修正依頼 → 更新 → 承認 の一連の流れを ContractTestBuilder で検証する。

use busify_core_service::{
    error::CoreError,
    test_utils::{ContractTestBuilder, ContractTestSetup},
    usecase::{
        ContractInput,
        CreateContractInput,
        LicenseFile,
        ListContractsInput,
        ReviewContractInput,
        UpdateContractInput,
    },
};
use busify_domain::contract::{Contract, ContractStatus};
use chrono::NaiveDate;

const OPERATOR: &str = "nhaxe@phuongtrang.vn";
const ADMIN: &str = "admin@busify.vn";

fn contract_input(operation_area: &str) -> ContractInput {
    ContractInput {
        email:          OPERATOR.to_string(),
        phone:          "0901234567".to_string(),
        address:        "80 Trần Hưng Đạo, Quận 1, TP.HCM".to_string(),
        vat_code:       "0301234567".to_string(),
        operation_area: operation_area.to_string(),
        start_date:     NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        end_date:       NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
    }
}

fn license(filename: &str) -> LicenseFile {
    LicenseFile {
        filename:     filename.to_string(),
        content_type: "application/pdf".to_string(),
        data:         b"%PDF-1.4".to_vec(),
    }
}

async fn create(setup: &ContractTestSetup) -> Contract {
    setup
        .sut
        .create_contract(CreateContractInput {
            contract: contract_input("Miền Nam"),
            license:  Some(license("giay-phep-v1.pdf")),
            actor:    OPERATOR.to_string(),
        })
        .await
        .unwrap()
}

async fn review(setup: &ContractTestSetup, contract: &Contract, action: &str) -> Result<Contract, CoreError> {
    setup
        .sut
        .review_contract(ReviewContractInput {
            contract_id: contract.id().clone(),
            action:      action.to_string(),
            admin_note:  Some("Kiểm tra lại giấy phép".to_string()),
            actor:       ADMIN.to_string(),
        })
        .await
}

#[tokio::test]
async fn test_修正依頼から承認までの一連の流れ() {
    // Arrange
    let builder = ContractTestBuilder::new();
    let now = builder.now();
    let setup = builder.build();

    // Act: 作成
    let created = create(&setup).await;
    assert_eq!(created.status(), ContractStatus::Pending);
    let first_license = created.license_url().unwrap().to_string();

    // Act: 修正依頼
    let revised = review(&setup, &created, "request_revision").await.unwrap();
    assert_eq!(revised.status(), ContractStatus::NeedRevision);
    assert_eq!(
        revised.admin_note().map(|n| n.as_str()),
        Some("Kiểm tra lại giấy phép")
    );

    // Act: ライセンスを差し替えて更新
    let updated = setup
        .sut
        .update_contract(UpdateContractInput {
            contract_id: created.id().clone(),
            contract:    contract_input("Miền Nam, Tây Nguyên"),
            license:     Some(license("giay-phep-v2.pdf")),
            actor:       OPERATOR.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(updated.status(), ContractStatus::Pending);
    assert!(updated.license_url().unwrap().ends_with("giay-phep-v2.pdf"));
    assert_eq!(setup.storage.deleted(), vec![first_license]);

    // Act: 承認
    let approved = review(&setup, &created, "APPROVE").await.unwrap();

    // Assert
    assert_eq!(approved.status(), ContractStatus::Accepted);
    assert_eq!(approved.approved_at(), Some(now));
    assert_eq!(approved.last_modified_by().as_str(), ADMIN);
    assert_eq!(setup.provisioner.provisioned(), vec![created.id().clone()]);

    let stored = setup.repo.snapshot(created.id()).unwrap();
    assert_eq!(stored.status(), ContractStatus::Accepted);
    assert_eq!(stored.version(), approved.version());
    assert_eq!(
        stored.details().operation_area.as_str(),
        "Miền Nam, Tây Nguyên"
    );
}

#[tokio::test]
async fn test_承認済みの契約は更新も再審査もできない() {
    // Arrange
    let setup = ContractTestBuilder::new().build();
    let created = create(&setup).await;
    review(&setup, &created, "approve").await.unwrap();

    // Act
    let update_result = setup
        .sut
        .update_contract(UpdateContractInput {
            contract_id: created.id().clone(),
            contract:    contract_input("Miền Bắc"),
            license:     None,
            actor:       OPERATOR.to_string(),
        })
        .await;
    let review_result = review(&setup, &created, "reject").await;

    // Assert
    assert!(matches!(update_result, Err(CoreError::InvalidStatus(_))));
    assert!(matches!(review_result, Err(CoreError::InvalidStatus(_))));
    assert_eq!(
        setup.repo.snapshot(created.id()).unwrap().status(),
        ContractStatus::Accepted
    );
}

#[tokio::test]
async fn test_プロビジョニング失敗時は審査前の状態に戻る() {
    // Arrange
    let setup = ContractTestBuilder::new()
        .with_failing_provisioner()
        .build();
    let created = create(&setup).await;
    let commits_before = setup.tx_manager.commits();

    // Act
    let result = review(&setup, &created, "APPROVE").await;

    // Assert
    match result {
        Err(CoreError::ProvisioningFailed {
            contract_id, email, ..
        }) => {
            assert_eq!(contract_id, created.id().to_string());
            assert_eq!(email, OPERATOR);
        }
        other => panic!("ProvisioningFailed を期待したが {:?} を受信", other),
    }
    let stored = setup.repo.snapshot(created.id()).unwrap();
    assert_eq!(stored.status(), ContractStatus::Pending);
    assert_eq!(stored.approved_at(), None);
    assert_eq!(setup.tx_manager.commits(), commits_before);
}

#[tokio::test]
async fn test_アップロード失敗時は契約を作成しない() {
    // Arrange
    let setup = ContractTestBuilder::new().with_failing_upload().build();

    // Act
    let result = setup
        .sut
        .create_contract(CreateContractInput {
            contract: contract_input("Miền Nam"),
            license:  Some(license("giay-phep.pdf")),
            actor:    OPERATOR.to_string(),
        })
        .await;

    // Assert
    assert!(matches!(
        result,
        Err(CoreError::UploadFailed { ref filename, .. }) if filename == "giay-phep.pdf"
    ));
    assert!(setup.repo.all().is_empty());
}

#[tokio::test]
async fn test_一覧はステータスで絞り込める() {
    // Arrange
    let setup = ContractTestBuilder::new().build();
    let first = create(&setup).await;
    create(&setup).await;
    review(&setup, &first, "reject").await.unwrap();

    // Act
    let page = setup
        .sut
        .list_contracts(ListContractsInput {
            page:           1,
            limit:          10,
            status:         Some("rejected".to_string()),
            email:          None,
            operation_area: None,
        })
        .await
        .unwrap();

    // Assert
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id(), first.id());
    assert_eq!(setup.sut.count_by_status("PENDING").await.unwrap(), 1);
}
