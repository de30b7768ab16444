//! # S3 オブジェクトストレージ
//!
//! 契約のライセンスファイルを Amazon S3 / MinIO に保存・削除する。
//!
//! ## 設計方針
//!
//! - **ローカル開発**: MinIO を使用（`S3_ENDPOINT_URL` で接続先を指定）
//! - **本番環境**: IAM ロールによる認証で Amazon S3 に接続（`S3_ENDPOINT_URL` 未設定）
//! - **公開 URL**: DB には `{public_base_url}/{key}` を保存し、削除時は URL からキーを逆算する
//!
//! ## オブジェクトキー
//!
//! ```text
//! {folder}/{uuid}-{filename}
//! licenses/0190a5c2-...-giay-phep.pdf
//! ```

use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};
use url::Url;
use uuid::Uuid;

use crate::InfraError;

/// オブジェクトストレージのインターフェース
///
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// ファイルをアップロードし、公開 URL を返す
    ///
    /// # 引数
    ///
    /// * `folder` - 保存先フォルダ（例: `licenses`）
    /// * `filename` - 元のファイル名
    /// * `content_type` - MIME タイプ
    /// * `data` - ファイル本体
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, InfraError>;

    /// 公開 URL が指すファイルを削除する
    ///
    /// このストレージ管理外の URL は何もしない。
    async fn delete_by_url(&self, url: &str) -> Result<(), InfraError>;
}

/// AWS S3 クライアント
///
/// `aws-sdk-s3` を使用した [`ObjectStorage`] の実装。MinIO とも互換動作する。
pub struct AwsS3Client {
    client:          Client,
    bucket_name:     String,
    public_base_url: Url,
}

impl AwsS3Client {
    /// 新しい S3 クライアントを作成する
    ///
    /// `public_base_url` が URL として不正な場合はエラー。
    pub fn new(
        client: Client,
        bucket_name: String,
        public_base_url: &str,
    ) -> Result<Self, InfraError> {
        let public_base_url = parse_base_url(public_base_url)?;
        Ok(Self {
            client,
            bucket_name,
            public_base_url,
        })
    }
}

#[async_trait]
impl ObjectStorage for AwsS3Client {
    #[tracing::instrument(skip_all, level = "debug", fields(%folder, %filename))]
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, InfraError> {
        let key = object_key(folder, Uuid::now_v7(), filename);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("PUT Object の実行に失敗: {e}")))?;

        Ok(public_url(&self.public_base_url, &key))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%url))]
    async fn delete_by_url(&self, url: &str) -> Result<(), InfraError> {
        let Some(key) = key_from_url(&self.public_base_url, url) else {
            tracing::debug!("管理外の URL のため削除をスキップ");
            return Ok(());
        };

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("DELETE Object の実行に失敗: {e}")))?;

        Ok(())
    }
}

/// 公開ベース URL をパースする
///
/// 末尾のスラッシュは正規化する。
pub fn parse_base_url(value: &str) -> Result<Url, InfraError> {
    let trimmed = value.trim_end_matches('/');
    Url::parse(trimmed)
        .map_err(|e| InfraError::invalid_input(format!("不正な公開ベース URL: {value}: {e}")))
}

/// オブジェクトキーを組み立てる
///
/// ファイル名の英数字と `.` `-` `_` 以外は `_` に置き換える。
pub fn object_key(folder: &str, id: Uuid, filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{folder}/{id}-{sanitized}")
}

/// キーから公開 URL を組み立てる
pub fn public_url(base: &Url, key: &str) -> String {
    format!("{}/{key}", base.as_str().trim_end_matches('/'))
}

/// 公開 URL からキーを取り出す
///
/// ベース URL 配下でなければ `None`。
pub fn key_from_url(base: &Url, url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let prefix = format!("{}/", base.as_str().trim_end_matches('/'));
    parsed
        .as_str()
        .strip_prefix(&prefix)
        .filter(|key| !key.is_empty())
        .map(String::from)
}

/// S3 クライアントを作成する
///
/// `endpoint` が `Some` の場合は MinIO 等のカスタムエンドポイントに接続する。
/// 認証情報は SDK のデフォルト認証チェーンで解決する。
pub async fn create_client(endpoint: Option<&str>) -> Client {
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("ap-southeast-1"));

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    // MinIO はパススタイルが必要
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn base() -> Url {
        parse_base_url("https://cdn.busify.vn/bucket/").unwrap()
    }

    #[test]
    fn test_オブジェクトキーはファイル名を無害化する() {
        let id = Uuid::nil();

        let key = object_key("licenses", id, "giấy phép 2025.pdf");

        assert_eq!(
            key,
            "licenses/00000000-0000-0000-0000-000000000000-gi_y_ph_p_2025.pdf"
        );
    }

    #[test]
    fn test_公開urlからキーを取り出せる() {
        let url = public_url(&base(), "licenses/abc-license.pdf");

        assert_eq!(url, "https://cdn.busify.vn/bucket/licenses/abc-license.pdf");
        assert_eq!(
            key_from_url(&base(), &url),
            Some("licenses/abc-license.pdf".to_string())
        );
    }

    #[rstest]
    #[case("https://res.cloudinary.com/demo/licenses/a.pdf")]
    #[case("https://cdn.busify.vn/bucket/")]
    #[case("not a url")]
    fn test_管理外のurlはnoneになる(#[case] url: &str) {
        assert_eq!(key_from_url(&base(), url), None);
    }

    #[test]
    fn test_不正な公開ベースurlはエラー() {
        assert!(parse_base_url("cdn.busify.vn").is_err());
    }
}
