//! # 共通値オブジェクト
//!
//! 契約と通知で共有される値オブジェクト。
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `i32` | 楽観的ロック用のバージョン番号 |
//! | [`Email`] | `String` | 運行会社・乗客のメールアドレス |
//! | [`Actor`] | `String` | 操作者（監査フィールドに記録する呼び出し元） |
//! | [`PhoneNumber`] | `String` | 連絡先電話番号（PII） |
//! | [`Address`] | `String` | 事業所住所（PII） |
//! | [`VatCode`] | `String` | 税番号 |
//! | [`OperationArea`] | `String` | 運行エリア |
//! | [`AdminNote`] | `String` | 審査コメント |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version
// =========================================================================

/// バージョン番号
///
/// 1 から始まり、書き込みのたびにインクリメントされる。
/// UPDATE の WHERE 句で比較し、並行更新を検出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(i32);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    /// 次のバージョン
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

// =========================================================================
// Email
// =========================================================================

/// メールアドレス
///
/// `local@domain` の形式と 255 文字以内を検証する。
/// 大文字小文字は保持する（検索側で大文字小文字を無視する）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.chars().count() > 255 {
            return Err(DomainError::Validation(
                "メールアドレスは255文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =========================================================================
// 検証付き文字列
// =========================================================================

define_validated_string! {
    /// 操作者
    ///
    /// 認証済みの呼び出し元の識別子（メールアドレスやユーザー名）。
    /// `created_by` / `last_modified_by` に記録する。
    pub struct Actor {
        label: "操作者",
        max_length: 255,
    }
}

define_validated_string! {
    /// 連絡先電話番号
    pub struct PhoneNumber {
        label: "電話番号",
        max_length: 20,
        pii: true,
    }
}

define_validated_string! {
    /// 事業所住所
    pub struct Address {
        label: "住所",
        max_length: 500,
        pii: true,
    }
}

define_validated_string! {
    /// 税番号（VAT コード）
    pub struct VatCode {
        label: "VAT コード",
        max_length: 50,
    }
}

define_validated_string! {
    /// 運行エリア
    pub struct OperationArea {
        label: "運行エリア",
        max_length: 255,
    }
}

define_validated_string! {
    /// 審査コメント
    pub struct AdminNote {
        label: "審査コメント",
        max_length: 2000,
    }
}

impl AdminNote {
    /// 任意入力のコメントを変換する
    ///
    /// 未指定または空白のみは `None`。
    pub fn optional(value: Option<String>) -> Result<Option<Self>, DomainError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::new(v).map(Some),
            _ => Ok(None),
        }
    }
}
