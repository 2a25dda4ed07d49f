use crate::{
    destination::{
        Cell, ColumnSchema, Credentials, DestinationAdapter, DestinationHandle, TableSchema,
    },
    error::DestinationError,
    sql::postgres::{
        params::PgParamStore,
        query::{render_insert, rows_per_statement},
        utils::{connect_client, db_message},
    },
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_postgres::Client;
use tracing::{debug, warn};

const QUERY_TABLE_COLUMNS_SQL: &str = include_str!("sql/table_columns.sql");

#[derive(Debug, Clone)]
struct PgColumn {
    name: String,
    sql_type: String,
    has_default: bool,
}

/// Postgres destination. Each handle owns one connection and at most one
/// open transaction, started by the first insert after a commit.
#[derive(Debug, Clone, Default)]
pub struct PgDestination;

impl PgDestination {
    pub fn new() -> Self {
        PgDestination
    }
}

#[async_trait]
impl DestinationAdapter for PgDestination {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn DestinationHandle>, DestinationError> {
        let client = connect_client(&credentials.url).await?;
        Ok(Box::new(PgDestinationHandle {
            client: Some(client),
            in_tx: false,
            tables: HashMap::new(),
        }))
    }
}

struct PgDestinationHandle {
    client: Option<Client>,
    in_tx: bool,
    tables: HashMap<String, Vec<PgColumn>>,
}

impl PgDestinationHandle {
    fn client(&self) -> Result<&Client, DestinationError> {
        self.client.as_ref().ok_or(DestinationError::Closed)
    }

    async fn load_columns(&mut self, table: &str) -> Result<&[PgColumn], DestinationError> {
        let key = table.to_lowercase();
        if !self.tables.contains_key(&key) {
            let rows = self
                .client()?
                .query(QUERY_TABLE_COLUMNS_SQL, &[&table])
                .await
                .map_err(|e| DestinationError::UnknownTable(format!("{table}: {}", db_message(&e))))?;

            let columns = rows
                .iter()
                .map(|row| {
                    Ok(PgColumn {
                        name: row.try_get("column_name")?,
                        sql_type: row.try_get("sql_type")?,
                        has_default: row.try_get("has_default")?,
                    })
                })
                .collect::<Result<Vec<_>, tokio_postgres::Error>>()
                .map_err(|e| DestinationError::UnknownTable(format!("{table}: {e}")))?;

            if columns.is_empty() {
                return Err(DestinationError::UnknownTable(table.to_string()));
            }
            self.tables.insert(key.clone(), columns);
        }
        Ok(self.tables.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    async fn begin(&mut self) -> Result<(), DestinationError> {
        if !self.in_tx {
            self.client()?
                .batch_execute("BEGIN")
                .await
                .map_err(|e| DestinationError::write(db_message(&e)))?;
            self.in_tx = true;
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationHandle for PgDestinationHandle {
    async fn describe(&mut self, table: &str) -> Result<TableSchema, DestinationError> {
        let columns = self.load_columns(table).await?;
        Ok(TableSchema::new(
            table,
            columns
                .iter()
                .map(|c| ColumnSchema {
                    name: c.name.clone(),
                    has_default: c.has_default,
                })
                .collect(),
        ))
    }

    async fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
    ) -> Result<(), DestinationError> {
        if rows.is_empty() {
            return Ok(());
        }
        if columns.is_empty() {
            return Err(DestinationError::write(format!(
                "no insertable columns for '{table}'"
            )));
        }

        let declared = self.load_columns(table).await?;
        let typed = columns
            .iter()
            .map(|name| {
                declared
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(name))
                    .map(|c| (c.name.clone(), c.sql_type.clone()))
                    .ok_or_else(|| {
                        DestinationError::write(format!(
                            "column '{name}' does not exist in '{table}'"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(idx) = rows.iter().position(|r| r.len() != typed.len()) {
            return Err(DestinationError::Write {
                row_index: Some(idx),
                message: format!("expected {} values, got {}", typed.len(), rows[idx].len()),
            });
        }

        self.begin().await?;

        let chunk_rows = rows_per_statement(typed.len());
        for chunk in rows.chunks(chunk_rows) {
            let sql = render_insert(table, &typed, chunk);
            let params = PgParamStore::from_rows(chunk);
            self.client()?
                .execute(sql.as_str(), &params.as_refs())
                .await
                .map_err(|e| DestinationError::write(db_message(&e)))?;
        }

        debug!(table, rows = rows.len(), "Inserted rows into Postgres");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DestinationError> {
        if !self.in_tx {
            return Ok(());
        }
        // The transaction is over whichever way COMMIT goes.
        self.in_tx = false;
        self.client()?
            .batch_execute("COMMIT")
            .await
            .map_err(|e| DestinationError::Commit(db_message(&e)))
    }

    async fn close(&mut self) -> Result<(), DestinationError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        if self.in_tx {
            self.in_tx = false;
            if let Err(e) = client.batch_execute("ROLLBACK").await {
                warn!(error = %db_message(&e), "Rollback on close failed");
                return Err(DestinationError::Close(db_message(&e)));
            }
        }
        Ok(())
    }
}
