//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。
//!
//! 読み込みは [`CoreConfig::from_lookup`] に集約し、テストでは HashMap を渡す。

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// S3 エンドポイント URL（MinIO 使用時に設定、未設定で AWS S3 デフォルト）
    pub s3_endpoint_url: Option<String>,
    /// S3 バケット名
    pub s3_bucket_name: String,
    /// ライセンスファイル公開 URL のベース
    pub s3_public_base_url: String,
    /// 運行会社プロビジョニングサービスのベース URL（未設定で Noop）
    pub provisioning_base_url: Option<String>,
    /// プロビジョニング呼び出しのタイムアウト
    pub provisioning_timeout: Duration,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// 通知の送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationBackend {
    /// Mailpit（開発）/ SMTP サーバー経由
    Smtp,
    /// Amazon SES v2 経由（本番）
    Ses,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 通知機能の設定
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:         NotificationBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:       String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:       u16,
    /// 送信元メールアドレス
    pub from_address:    String,
    /// フロントエンド URL（メール内リンク用）
    pub frontend_url:    String,
    /// 同時に実行する送信タスクの上限
    pub max_concurrency: usize,
    /// 乗車券 PDF 用の TrueType フォント（未設定で組み込みフォント）
    pub ticket_font:     Option<PathBuf>,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: optional("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse("CORE_PORT", &required("CORE_PORT")?)?,
            database_url: required("DATABASE_URL")?,
            s3_endpoint_url: optional("S3_ENDPOINT_URL"),
            s3_bucket_name: required("S3_BUCKET_NAME")?,
            s3_public_base_url: required("S3_PUBLIC_BASE_URL")?,
            provisioning_base_url: optional("PROVISIONING_BASE_URL"),
            provisioning_timeout: Duration::from_secs(parse_or(
                "PROVISIONING_TIMEOUT_SECS",
                optional("PROVISIONING_TIMEOUT_SECS"),
                10,
            )?),
            notification: NotificationConfig {
                backend:         parse_or(
                    "NOTIFICATION_BACKEND",
                    optional("NOTIFICATION_BACKEND"),
                    NotificationBackend::Noop,
                )?,
                smtp_host:       optional("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                smtp_port:       parse_or("SMTP_PORT", optional("SMTP_PORT"), 1025)?,
                from_address:    optional("NOTIFICATION_FROM_ADDRESS")
                    .unwrap_or_else(|| "noreply@busify.example.com".to_string()),
                frontend_url:    optional("FRONTEND_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "http://localhost:5173".to_string()),
                max_concurrency: positive(parse_or(
                    "NOTIFICATION_MAX_CONCURRENCY",
                    optional("NOTIFICATION_MAX_CONCURRENCY"),
                    8,
                )?)?,
                ticket_font:     optional("TICKET_PDF_FONT_PATH").map(PathBuf::from),
            },
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse(name, &v),
        None => Ok(default),
    }
}

fn positive(value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name:  "NOTIFICATION_MAX_CONCURRENCY",
            value: "0".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn minimal() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("CORE_PORT", "13001"),
            ("DATABASE_URL", "postgres://busify@localhost/busify"),
            ("S3_BUCKET_NAME", "busify-licenses"),
            ("S3_PUBLIC_BASE_URL", "https://cdn.busify.vn"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<CoreConfig, ConfigError> {
        CoreConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_必須項目のみでデフォルト値が入る() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 13001);
        assert_eq!(config.s3_endpoint_url, None);
        assert_eq!(config.provisioning_base_url, None);
        assert_eq!(config.provisioning_timeout, Duration::from_secs(10));
        assert_eq!(config.notification.backend, NotificationBackend::Noop);
        assert_eq!(config.notification.smtp_host, "localhost");
        assert_eq!(config.notification.smtp_port, 1025);
        assert_eq!(
            config.notification.from_address,
            "noreply@busify.example.com"
        );
        assert_eq!(config.notification.frontend_url, "http://localhost:5173");
        assert_eq!(config.notification.max_concurrency, 8);
        assert_eq!(config.notification.ticket_font, None);
    }

    #[test]
    fn test_必須項目が欠けるとmissingを返す() {
        let mut vars = minimal();
        vars.remove("S3_PUBLIC_BASE_URL");

        let err = load(&vars).unwrap_err();

        assert_eq!(err, ConfigError::Missing("S3_PUBLIC_BASE_URL"));
    }

    #[test]
    fn test_空文字の必須項目は未設定として扱う() {
        let mut vars = minimal();
        vars.insert("DATABASE_URL", "  ");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn test_ポート番号が数値でなければinvalidを返す() {
        let mut vars = minimal();
        vars.insert("CORE_PORT", "abc");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid {
                name:  "CORE_PORT",
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_通知設定を上書きできる() {
        let mut vars = minimal();
        vars.insert("NOTIFICATION_BACKEND", "ses");
        vars.insert("FRONTEND_URL", "https://busify.vn/");
        vars.insert("NOTIFICATION_MAX_CONCURRENCY", "2");
        vars.insert("TICKET_PDF_FONT_PATH", "/usr/share/fonts/DejaVuSans.ttf");
        vars.insert("PROVISIONING_BASE_URL", "http://operator-service:8080");
        vars.insert("PROVISIONING_TIMEOUT_SECS", "3");

        let config = load(&vars).unwrap();

        assert_eq!(config.notification.backend, NotificationBackend::Ses);
        assert_eq!(config.notification.frontend_url, "https://busify.vn");
        assert_eq!(config.notification.max_concurrency, 2);
        assert_eq!(
            config.notification.ticket_font,
            Some(PathBuf::from("/usr/share/fonts/DejaVuSans.ttf"))
        );
        assert_eq!(
            config.provisioning_base_url.as_deref(),
            Some("http://operator-service:8080")
        );
        assert_eq!(config.provisioning_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_未知のバックエンドはinvalidを返す() {
        let mut vars = minimal();
        vars.insert("NOTIFICATION_BACKEND", "sendgrid");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                name: "NOTIFICATION_BACKEND",
                ..
            })
        ));
    }

    #[test]
    fn test_同時送信数0は不正() {
        let mut vars = minimal();
        vars.insert("NOTIFICATION_MAX_CONCURRENCY", "0");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                name: "NOTIFICATION_MAX_CONCURRENCY",
                ..
            })
        ));
    }
}
