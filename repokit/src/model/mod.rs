//! Domain records and their value representations
//!
//! Every record embeds [`Metadata`] and is soft-deleted through its
//! `deleted_at` column.

pub mod api_key;
pub mod metadata;
pub mod user;

pub use api_key::{ApiKey, ApiKeyDto, ApiKeyDuration};
pub use metadata::Metadata;
pub use user::{User, UserDto, UserStatus};
