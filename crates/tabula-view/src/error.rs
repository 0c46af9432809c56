use thiserror::Error;

pub type ViewResult<T> = Result<T, ViewError>;

/// Configuration-time errors.
///
/// Row-level operations (filter, sort, format, paginate) never fail; these
/// errors only come out of operations that change view configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewError {
    #[error("Column '{column}' is not a foreign key of table '{table}'")]
    NotForeignKey { table: String, column: String },

    #[error("Foreign key to '{referenced_table}' does not involve column '{column}'")]
    ForeignKeyMismatch {
        column: String,
        referenced_table: String,
    },

    #[error("Lookup chain exceeds the maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Lookup chain has no levels")]
    EmptyChain,

    #[error("Lookup chain is incomplete: {0}")]
    IncompleteChain(String),

    #[error("Invalid filter expression: {0}")]
    InvalidFilterExpression(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
