use crate::error::TransferError;
use connectors::destination::{Cell, ColumnSchema, TableSchema};
use model::records::{
    batch::Batch,
    record::{ColumnarRecord, Record, TupleRecord},
};

/// A batch in the destination's shape: positional rows following `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Projects batches onto the destination's declared column order.
///
/// Tuple records bind by position and must carry exactly one value per
/// declared column. Columnar records are matched by name (ignoring case).
/// Each record is checked on its own: a defaulted column it lacks becomes
/// [`Cell::Default`], and a defaulted column that no record of the batch
/// carries is left out of the insert altogether.
#[derive(Debug, Clone)]
pub struct Reshaper {
    columns: Vec<ColumnSchema>,
}

impl Reshaper {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Reshaper { columns }
    }

    pub fn from_schema(schema: TableSchema) -> Self {
        Reshaper::new(schema.columns)
    }

    /// Column order given explicitly; none of the columns has a default.
    pub fn from_mapping(names: &[String]) -> Self {
        Reshaper::new(names.iter().map(ColumnSchema::new).collect())
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn reshape(&self, batch: &Batch) -> Result<RowSet, TransferError> {
        let Some(first) = batch.records.first() else {
            return Ok(RowSet {
                columns: self.names(),
                rows: Vec::new(),
            });
        };

        match first {
            Record::Tuple(_) => self.reshape_tuples(batch),
            Record::Columnar(_) => self.reshape_columnar(batch),
        }
    }

    fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn reshape_tuples(&self, batch: &Batch) -> Result<RowSet, TransferError> {
        let rows = batch
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let tuple = as_tuple(record, batch.seq, idx)?;
                if tuple.arity() != self.columns.len() {
                    return Err(mismatch(
                        batch.seq,
                        format!(
                            "record {idx} has {} values but the table declares {} columns",
                            tuple.arity(),
                            self.columns.len()
                        ),
                    ));
                }
                Ok(tuple.values.iter().cloned().map(Cell::Value).collect())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RowSet {
            columns: self.names(),
            rows,
        })
    }

    fn reshape_columnar(&self, batch: &Batch) -> Result<RowSet, TransferError> {
        let records = batch
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| as_columnar(record, batch.seq, idx))
            .collect::<Result<Vec<_>, _>>()?;

        for (idx, record) in records.iter().enumerate() {
            if let Some(extra) = record.names().find(|name| !self.declares(name)) {
                return Err(mismatch(
                    batch.seq,
                    format!("record {idx} carries column '{extra}' the table does not declare"),
                ));
            }
        }

        let mut included = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if column.has_default {
                if records.iter().any(|r| r.contains(&column.name)) {
                    included.push(column);
                }
                continue;
            }
            if let Some(idx) = records.iter().position(|r| !r.contains(&column.name)) {
                return Err(mismatch(
                    batch.seq,
                    format!(
                        "record {idx} lacks column '{}' which has no default",
                        column.name
                    ),
                ));
            }
            included.push(column);
        }

        let rows = records
            .iter()
            .map(|record| {
                included
                    .iter()
                    .map(|c| match record.get(&c.name) {
                        Some(value) => Cell::Value(value.clone()),
                        None => Cell::Default,
                    })
                    .collect()
            })
            .collect();

        Ok(RowSet {
            columns: included.iter().map(|c| c.name.clone()).collect(),
            rows,
        })
    }

    fn declares(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}

fn as_tuple(record: &Record, batch: u64, idx: usize) -> Result<&TupleRecord, TransferError> {
    match record {
        Record::Tuple(t) => Ok(t),
        Record::Columnar(_) => Err(mismatch(
            batch,
            format!("record {idx} is columnar in a tuple batch"),
        )),
    }
}

fn as_columnar(record: &Record, batch: u64, idx: usize) -> Result<&ColumnarRecord, TransferError> {
    match record {
        Record::Columnar(c) => Ok(c),
        Record::Tuple(_) => Err(mismatch(
            batch,
            format!("record {idx} is a tuple in a columnar batch"),
        )),
    }
}

fn mismatch(batch: u64, message: String) -> TransferError {
    TransferError::SchemaMismatch {
        batch: Some(batch),
        message,
    }
}
