use crate::error::DestinationError;
use async_trait::async_trait;
use model::core::value::Value;
use std::fmt;

/// Opaque connection material for a destination. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub url: String,
}

impl Credentials {
    pub fn new(url: impl Into<String>) -> Self {
        Credentials { url: url.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// One positional entry of a row handed to `bulk_insert`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(Value),
    /// The record left the column out; the destination applies its default.
    Default,
}

impl Cell {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cell::Value(value) => Some(value),
            Cell::Default => None,
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::Value(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    /// The destination fills the column when an insert omits it.
    pub has_default: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnSchema {
            name: name.into(),
            has_default: false,
        }
    }

    pub fn with_default(name: impl Into<String>) -> Self {
        ColumnSchema {
            name: name.into(),
            has_default: true,
        }
    }
}

/// Declared, ordered columns of a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        TableSchema {
            table: table.into(),
            columns,
        }
    }

    /// Schema where every column is required.
    pub fn from_names<S: AsRef<str>>(table: impl Into<String>, names: &[S]) -> Self {
        TableSchema::new(
            table,
            names.iter().map(|n| ColumnSchema::new(n.as_ref())).collect(),
        )
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A transactional store that accepts bulk writes.
#[async_trait]
pub trait DestinationAdapter: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn DestinationHandle>, DestinationError>;
}

/// An open destination connection. Writes issued through `bulk_insert`
/// become durable only after `commit` returns.
#[async_trait]
pub trait DestinationHandle: Send {
    async fn describe(&mut self, table: &str) -> Result<TableSchema, DestinationError>;

    /// Inserts all rows in one bulk operation. `rows` are positional and
    /// follow `columns`; a [`Cell::Default`] entry takes the column default.
    async fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
    ) -> Result<(), DestinationError>;

    async fn commit(&mut self) -> Result<(), DestinationError>;

    async fn close(&mut self) -> Result<(), DestinationError>;
}
