//! # quarry-engine
//!
//! Repositories that tie Quarry's compilers to an external execution layer.
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`driver`] - Driver and marshaling boundary traits
//! - [`repository`] - Relational and document repositories
//!
//! The `sql` and `document` features (both on by default) select which
//! repositories and driver traits are built.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod driver;
pub mod repository;

pub use config::Config;
pub use driver::{DriverError, FromRecord};
#[cfg(feature = "document")]
pub use driver::DocumentDriver;
#[cfg(feature = "sql")]
pub use driver::SqlDriver;
pub use repository::RepositoryError;
#[cfg(feature = "document")]
pub use repository::DocumentRepository;
#[cfg(feature = "sql")]
pub use repository::SqlRepository;
