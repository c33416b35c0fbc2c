//! The execution boundary.
//!
//! Quarry compiles queries; it never talks to a database. Drivers execute
//! compiled statements or find commands and hand back raw rows or documents,
//! which [`FromRecord`] turns into entities.

#[cfg(feature = "document")]
use quarry_adapters::FindCommand;
#[cfg(feature = "sql")]
use quarry_common::Value;

/// Error type drivers return. Propagated unchanged.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Executes parameterized SQL.
#[cfg(feature = "sql")]
pub trait SqlDriver: Send + Sync {
    /// Raw row type.
    type Row;

    /// Runs `sql` with `args` bound to its placeholders in order.
    ///
    /// # Errors
    ///
    /// Any execution failure.
    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Self::Row>, DriverError>;

    /// Eager-loads `relation` of `table` into `rows` after the main query.
    ///
    /// # Errors
    ///
    /// Any execution failure, including an unknown relation.
    fn preload(&self, table: &str, relation: &str, rows: &mut [Self::Row]) -> Result<(), DriverError>;
}

/// Executes document find commands.
#[cfg(feature = "document")]
pub trait DocumentDriver: Send + Sync {
    /// Raw document type.
    type Document;

    /// Runs `command` against `collection`.
    ///
    /// # Errors
    ///
    /// Any execution failure.
    fn find(&self, collection: &str, command: &FindCommand) -> Result<Vec<Self::Document>, DriverError>;
}

/// Converts a raw record into an entity.
pub trait FromRecord<R>: Sized {
    /// Converts `record`, describing the problem on failure.
    ///
    /// # Errors
    ///
    /// Returns a message when the record does not fit the entity.
    fn from_record(record: R) -> Result<Self, String>;
}
