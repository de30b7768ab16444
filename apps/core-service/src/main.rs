//! # Core Service サーバー
//!
//! 運行会社契約と乗客向け通知を扱う内部サービス。
//!
//! ## 役割
//!
//! - **契約**: 運行会社の契約申請・更新と管理者による審査、承認時の運行会社プロビジョニング
//! - **通知**: 乗車券確認などのメールをテンプレートから生成し、バックグラウンドで送信
//! - **データ永続化**: PostgreSQL への契約・通知ログの保存、S3 へのライセンスファイル保存
//!
//! ## アクセス制御
//!
//! Core Service は内部ネットワークからのみアクセス可能とする。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `S3_ENDPOINT_URL` | No | MinIO などの S3 互換エンドポイント |
//! | `S3_BUCKET_NAME` | **Yes** | ライセンスファイルのバケット |
//! | `S3_PUBLIC_BASE_URL` | **Yes** | ライセンスファイル公開 URL のベース |
//! | `PROVISIONING_BASE_URL` | No | 運行会社プロビジョニングサービス（未設定で Noop） |
//! | `PROVISIONING_TIMEOUT_SECS` | No | プロビジョニング呼び出しのタイムアウト秒（デフォルト: 10） |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | デフォルト: `localhost` / `1025` |
//! | `NOTIFICATION_FROM_ADDRESS` | No | 送信元アドレス |
//! | `FRONTEND_URL` | No | メール内リンクのベース URL |
//! | `NOTIFICATION_MAX_CONCURRENCY` | No | 同時送信数（デフォルト: 8） |
//! | `TICKET_PDF_FONT_PATH` | No | 乗車券 PDF 用 TrueType フォント |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! CORE_PORT=13001 DATABASE_URL=postgres://... cargo run -p busify-core-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use busify_core_service::{
    config::{CoreConfig, NotificationBackend, NotificationConfig},
    handler::{
        ContractState,
        NotificationState,
        ReadinessState,
        count_contracts,
        create_contract,
        get_contract,
        health_check,
        list_contracts,
        list_my_contracts,
        readiness_check,
        review_contract,
        send_notification,
        update_contract,
    },
    usecase::{
        ContractUseCaseImpl,
        NotificationDispatcher,
        NotificationService,
        TemplateRenderer,
        TicketPdfRenderer,
    },
};
use busify_domain::clock::{Clock, SystemClock};
use busify_infra::{
    db::{self, PgTransactionManager},
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
        create_ses_client,
    },
    provisioning::{HttpOperatorProvisioner, NoopOperatorProvisioner, OperatorProvisioner},
    repository::{PostgresContractRepository, PostgresNotificationLogRepository},
    s3::{self, AwsS3Client},
};
use busify_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Core Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_tracing(&TracingConfig::from_env("core-service"));

    // 設定読み込み
    let config = CoreConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;
    tracing::info!("マイグレーションを適用しました");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 契約関連の依存コンポーネント
    let s3_client = s3::create_client(config.s3_endpoint_url.as_deref()).await;
    let storage = AwsS3Client::new(
        s3_client,
        config.s3_bucket_name.clone(),
        &config.s3_public_base_url,
    )
    .context("S3 クライアントの初期化に失敗しました")?;
    let provisioner: Arc<dyn OperatorProvisioner> = match &config.provisioning_base_url {
        Some(url) => Arc::new(
            HttpOperatorProvisioner::new(url, config.provisioning_timeout)
                .context("プロビジョニングクライアントの初期化に失敗しました")?,
        ),
        None => {
            tracing::warn!("PROVISIONING_BASE_URL が未設定のため Noop プロビジョナーを使用します");
            Arc::new(NoopOperatorProvisioner)
        }
    };
    let contract_usecase = ContractUseCaseImpl::new(
        Arc::new(PostgresContractRepository::new(pool.clone())),
        Arc::new(PgTransactionManager::new(pool.clone())),
        Arc::new(storage),
        provisioner,
        clock.clone(),
    );
    let contract_state = Arc::new(ContractState {
        usecase: contract_usecase,
    });

    // 通知関連の依存コンポーネント
    let notification_service = NotificationService::new(
        build_notification_sender(&config.notification).await,
        TemplateRenderer::new().context("メールテンプレートの読み込みに失敗しました")?,
        TicketPdfRenderer::new(config.notification.ticket_font.as_deref())
            .context("乗車券 PDF 用フォントの読み込みに失敗しました")?,
        Arc::new(PostgresNotificationLogRepository::new(pool.clone())),
        clock,
        config.notification.frontend_url.clone(),
    );
    let notification_state = Arc::new(NotificationState {
        dispatcher: NotificationDispatcher::new(
            Arc::new(notification_service),
            config.notification.max_concurrency,
        ),
    });

    let readiness_state = Arc::new(ReadinessState { pool });

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .merge(
            Router::new()
                .route(
                    "/internal/contracts",
                    post(create_contract).get(list_contracts),
                )
                .route("/internal/contracts/mine", get(list_my_contracts))
                .route("/internal/contracts/count", get(count_contracts))
                .route(
                    "/internal/contracts/{contract_id}",
                    get(get_contract).put(update_contract),
                )
                .route(
                    "/internal/contracts/{contract_id}/review",
                    post(review_contract),
                )
                .with_state(contract_state),
        )
        .route("/internal/notifications/{kind}", post(send_notification))
        .with_state(notification_state)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `NOTIFICATION_BACKEND` に応じた送信実装を選ぶ
async fn build_notification_sender(config: &NotificationConfig) -> Arc<dyn NotificationSender> {
    match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                "SMTP で通知を送信します: {}:{}",
                config.smtp_host,
                config.smtp_port
            );
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Ses => {
            tracing::info!("Amazon SES で通知を送信します");
            Arc::new(SesNotificationSender::new(
                create_ses_client().await,
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Noop => {
            tracing::info!("通知は送信せずログに出力します");
            Arc::new(NoopNotificationSender)
        }
    }
}
