use crate::{
    destination::{Cell, Credentials, DestinationAdapter, DestinationHandle, TableSchema},
    error::DestinationError,
};
use async_trait::async_trait;
use model::{core::value::Value, records::record::ColumnarRecord};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::debug;

/// Every call a handle received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationCall {
    Connect,
    Describe(String),
    BulkInsert {
        table: String,
        columns: Vec<String>,
        rows: usize,
    },
    Commit,
    Close,
}

/// Failure to inject into a [`MemoryDestination`]. `call` counts the
/// matching operation from 1 across all handles.
#[derive(Debug, Clone)]
pub enum DestinationFailure {
    Connect(String),
    Insert {
        call: usize,
        row_index: Option<usize>,
        message: String,
    },
    Commit {
        call: usize,
        message: String,
    },
    Close(String),
}

#[derive(Default)]
struct Staged {
    table: String,
    rows: Vec<ColumnarRecord>,
}

#[derive(Default)]
struct Store {
    committed: HashMap<String, Vec<ColumnarRecord>>,
    commit_sizes: Vec<usize>,
    calls: Vec<DestinationCall>,
    inserts: usize,
    commits: usize,
    open_handles: usize,
}

/// Transactional in-memory table store. Inserted rows stay staged on the
/// handle until `commit`; closing a handle discards whatever is staged.
/// Tables carry no default values, so a [`Cell::Default`] column is left out
/// of the stored row.
#[derive(Clone, Default)]
pub struct MemoryDestination {
    tables: HashMap<String, TableSchema>,
    failures: Vec<DestinationFailure>,
    store: Arc<Mutex<Store>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: TableSchema) -> Self {
        self.tables.insert(schema.table.to_lowercase(), schema);
        self
    }

    pub fn with_failure(mut self, failure: DestinationFailure) -> Self {
        self.failures.push(failure);
        self
    }

    pub async fn committed_rows(&self, table: &str) -> Vec<ColumnarRecord> {
        let store = self.store.lock().await;
        store
            .committed
            .get(&table.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Committed rows as positional values in insert column order, without
    /// the columns that took their default.
    pub async fn committed_values(&self, table: &str) -> Vec<Vec<Value>> {
        self.committed_rows(table)
            .await
            .into_iter()
            .map(|row| row.fields.into_iter().map(|f| f.value).collect())
            .collect()
    }

    /// Number of rows made durable by each commit, in commit order.
    pub async fn commit_sizes(&self) -> Vec<usize> {
        self.store.lock().await.commit_sizes.clone()
    }

    pub async fn calls(&self) -> Vec<DestinationCall> {
        self.store.lock().await.calls.clone()
    }

    pub async fn open_handles(&self) -> usize {
        self.store.lock().await.open_handles
    }
}

#[async_trait]
impl DestinationAdapter for MemoryDestination {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn DestinationHandle>, DestinationError> {
        for failure in &self.failures {
            if let DestinationFailure::Connect(msg) = failure {
                return Err(DestinationError::Connection(msg.clone()));
            }
        }

        let mut store = self.store.lock().await;
        store.calls.push(DestinationCall::Connect);
        store.open_handles += 1;

        Ok(Box::new(MemoryDestinationHandle {
            tables: self.tables.clone(),
            failures: self.failures.clone(),
            store: self.store.clone(),
            staged: Vec::new(),
            closed: false,
        }))
    }
}

struct MemoryDestinationHandle {
    tables: HashMap<String, TableSchema>,
    failures: Vec<DestinationFailure>,
    store: Arc<Mutex<Store>>,
    staged: Vec<Staged>,
    closed: bool,
}

impl MemoryDestinationHandle {
    fn ensure_open(&self) -> Result<(), DestinationError> {
        if self.closed {
            return Err(DestinationError::Closed);
        }
        Ok(())
    }

    fn check_columns(&self, table: &str, columns: &[String]) -> Result<(), DestinationError> {
        if self.tables.is_empty() {
            return Ok(());
        }
        let schema = self
            .tables
            .get(&table.to_lowercase())
            .ok_or_else(|| DestinationError::UnknownTable(table.to_string()))?;
        if let Some(unknown) = columns.iter().find(|c| schema.column(c).is_none()) {
            return Err(DestinationError::write(format!(
                "column '{unknown}' does not exist in '{table}'"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationHandle for MemoryDestinationHandle {
    async fn describe(&mut self, table: &str) -> Result<TableSchema, DestinationError> {
        self.ensure_open()?;
        self.store
            .lock()
            .await
            .calls
            .push(DestinationCall::Describe(table.to_string()));
        self.tables
            .get(&table.to_lowercase())
            .cloned()
            .ok_or_else(|| DestinationError::UnknownTable(table.to_string()))
    }

    async fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
    ) -> Result<(), DestinationError> {
        self.ensure_open()?;
        let call = {
            let mut store = self.store.lock().await;
            store.inserts += 1;
            store.calls.push(DestinationCall::BulkInsert {
                table: table.to_string(),
                columns: columns.to_vec(),
                rows: rows.len(),
            });
            store.inserts
        };

        for failure in &self.failures {
            if let DestinationFailure::Insert {
                call: at,
                row_index,
                message,
            } = failure
                && *at == call
            {
                return Err(DestinationError::Write {
                    row_index: *row_index,
                    message: message.clone(),
                });
            }
        }

        self.check_columns(table, columns)?;
        if let Some(idx) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(DestinationError::Write {
                row_index: Some(idx),
                message: format!(
                    "expected {} values, got {}",
                    columns.len(),
                    rows[idx].len()
                ),
            });
        }

        let staged_rows = rows.iter().map(|row| {
            columns
                .iter()
                .zip(row)
                .filter_map(|(name, cell)| Some((name.clone(), cell.value()?.clone())))
                .collect::<ColumnarRecord>()
        });
        self.staged.push(Staged {
            table: table.to_lowercase(),
            rows: staged_rows.collect(),
        });

        debug!(table, rows = rows.len(), "Staged rows in memory destination");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DestinationError> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.commits += 1;
        store.calls.push(DestinationCall::Commit);
        let call = store.commits;

        for failure in &self.failures {
            if let DestinationFailure::Commit { call: at, message } = failure
                && *at == call
            {
                self.staged.clear();
                return Err(DestinationError::Commit(message.clone()));
            }
        }

        let mut committed = 0;
        for staged in self.staged.drain(..) {
            committed += staged.rows.len();
            store
                .committed
                .entry(staged.table)
                .or_default()
                .extend(staged.rows);
        }
        store.commit_sizes.push(committed);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DestinationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.staged.clear();

        let mut store = self.store.lock().await;
        store.calls.push(DestinationCall::Close);
        store.open_handles = store.open_handles.saturating_sub(1);

        for failure in &self.failures {
            if let DestinationFailure::Close(msg) = failure {
                return Err(DestinationError::Close(msg.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::ColumnSchema;

    fn creds() -> Credentials {
        Credentials::new("memory://")
    }

    fn cells(values: Vec<Value>) -> Vec<Cell> {
        values.into_iter().map(Cell::from).collect()
    }

    #[tokio::test]
    async fn rows_become_visible_on_commit() {
        let dest = MemoryDestination::new()
            .with_table(TableSchema::from_names("people", &["id", "name"]));
        let mut handle = dest.connect(&creds()).await.unwrap();
        let columns = vec!["id".to_string(), "name".to_string()];

        handle
            .bulk_insert("people", &columns, &[cells(vec![Value::Int(1), "a".into()])])
            .await
            .unwrap();
        assert!(dest.committed_rows("people").await.is_empty());

        handle.commit().await.unwrap();
        assert_eq!(
            dest.committed_values("people").await,
            vec![vec![Value::Int(1), Value::from("a")]]
        );
        assert_eq!(dest.commit_sizes().await, vec![1]);
    }

    #[tokio::test]
    async fn close_discards_staged_rows() {
        let dest = MemoryDestination::new();
        let mut handle = dest.connect(&creds()).await.unwrap();
        handle
            .bulk_insert("t", &["a".to_string()], &[cells(vec![Value::Null])])
            .await
            .unwrap();
        handle.close().await.unwrap();

        assert!(dest.committed_rows("t").await.is_empty());
        assert_eq!(dest.open_handles().await, 0);
        assert!(matches!(handle.commit().await, Err(DestinationError::Closed)));
    }

    #[tokio::test]
    async fn arity_mismatch_reports_row_index() {
        let dest = MemoryDestination::new();
        let mut handle = dest.connect(&creds()).await.unwrap();
        let err = handle
            .bulk_insert(
                "t",
                &["a".to_string()],
                &[
                    cells(vec![Value::Int(1)]),
                    cells(vec![Value::Int(1), Value::Int(2)]),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DestinationError::Write { row_index: Some(1), .. }));
    }

    #[tokio::test]
    async fn injected_commit_failure_drops_staged_rows() {
        let dest = MemoryDestination::new().with_failure(DestinationFailure::Commit {
            call: 1,
            message: "serialization failure".into(),
        });
        let mut handle = dest.connect(&creds()).await.unwrap();
        handle
            .bulk_insert("t", &["a".to_string()], &[cells(vec![Value::Int(1)])])
            .await
            .unwrap();

        assert!(matches!(handle.commit().await, Err(DestinationError::Commit(_))));
        assert!(dest.committed_rows("t").await.is_empty());
    }

    #[tokio::test]
    async fn default_cells_are_left_out_of_the_row() {
        let dest = MemoryDestination::new().with_table(TableSchema::new(
            "people",
            vec![ColumnSchema::new("id"), ColumnSchema::with_default("created_at")],
        ));
        let mut handle = dest.connect(&creds()).await.unwrap();
        let columns = vec!["id".to_string(), "created_at".to_string()];

        handle
            .bulk_insert(
                "people",
                &columns,
                &[
                    vec![Value::Int(1).into(), Value::from("2024-01-01").into()],
                    vec![Value::Int(2).into(), Cell::Default],
                ],
            )
            .await
            .unwrap();
        handle.commit().await.unwrap();

        let rows = dest.committed_rows("people").await;
        assert_eq!(rows[0].get("created_at"), Some(&Value::from("2024-01-01")));
        assert_eq!(rows[1].get("id"), Some(&Value::Int(2)));
        assert!(!rows[1].contains("created_at"));
    }
}
