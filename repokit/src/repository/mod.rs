//! Typed data access over a relational store
//!
//! This module provides the repository contract, its generic implementation,
//! and the value types queries are built from.
//!
//! # Features
//!
//! - **Generic CRUD**: [`Repository`] implemented once by [`GenericRepository`]
//! - **Conversion capability**: [`Model`] maps storable records to values
//! - **Predicates**: [`Specification`] trees compiled to [`Fragment`]s
//! - **Pagination**: [`Pagination`] windows and [`PaginationMetadata`]
//! - **Errors**: [`RepositoryError`] with a [`RepositoryErrorKind`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::context::Context;
//! use repokit::repository::{and, Repository, Specification};
//!
//! let ctx = Context::background();
//! let available = repo
//!     .find(&ctx, &[and([
//!         Specification::greater_or_equal("weight", 90),
//!         Specification::equal("is_available", true),
//!     ])])
//!     .await?;
//! ```

pub mod error;
pub mod generic;
pub mod pagination;
pub mod specification;
pub mod traits;
pub mod value;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use generic::GenericRepository;
pub use pagination::{Pagination, PaginationMetadata};
pub use specification::{and, or, Fragment, Operator, Specification};
pub use traits::{Model, Repository};
pub use value::Scalar;
