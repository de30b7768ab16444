//! # Busify ドメイン層
//!
//! 契約審査と顧客向け通知のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の ID を持つ（[`contract::Contract`]）
//! - **値オブジェクト**: 生成時に検証される不変の値（[`value_objects`]）
//! - **ステートマシン**: 契約ステータスは ADT で表現し、不正な遷移をメソッドで拒否する
//! - **ドメインエラー**: ビジネスルール違反を [`DomainError`] で表す
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層は DB や外部サービスに依存しない。
//!
//! ## 使用例
//!
//! ```rust
//! use busify_domain::contract::{ContractStatus, ReviewAction};
//!
//! let action: ReviewAction = "approve".parse().unwrap();
//! assert_eq!(action.resulting_status(), ContractStatus::Accepted);
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod contract;
pub mod error;
pub mod notification;
pub mod value_objects;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::DomainError;
