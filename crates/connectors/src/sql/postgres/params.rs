use crate::destination::Cell;
use model::core::value::Value;
use tokio_postgres::types::ToSql;

/// A bind parameter in text form. Statements cast it to the column type,
/// so one encoding serves every destination column.
pub struct PgParam(Option<String>);

impl PgParam {
    pub fn from_value(value: &Value) -> Self {
        PgParam(value.to_text())
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    /// Flattens rows in row-major order, matching placeholder numbering.
    /// Default cells bind nothing.
    pub fn from_rows(rows: &[Vec<Cell>]) -> Self {
        let total = rows.iter().map(|row| row.len()).sum();
        let mut params = Vec::with_capacity(total);
        for row in rows {
            params.extend(row.iter().filter_map(Cell::value).map(PgParam::from_value));
        }
        Self { params }
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
