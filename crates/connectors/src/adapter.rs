use crate::{
    destination::DestinationAdapter,
    error::AdapterError,
    file::csv::source::{CsvDataSource, CsvSettings},
    memory::{MemoryDestination, MemorySource},
    source::SourceAdapter,
    sql::postgres::PgDestination,
};
use model::records::record::RecordShape;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Drivers a transfer can be wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Empty source / discarding destination, useful for dry runs.
    Memory,
    Csv,
    Postgres,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Memory => write!(f, "memory"),
            Driver::Csv => write!(f, "csv"),
            Driver::Postgres => write!(f, "postgres"),
        }
    }
}

/// Builds the source adapter for `driver`.
pub fn source_adapter(
    driver: Driver,
    shape: RecordShape,
    csv: CsvSettings,
) -> Result<Arc<dyn SourceAdapter>, AdapterError> {
    match driver {
        Driver::Memory => Ok(Arc::new(MemorySource::from_records(shape, Vec::new()))),
        Driver::Csv => Ok(Arc::new(CsvDataSource::new(csv, shape))),
        Driver::Postgres => Err(AdapterError::UnsupportedRole {
            driver: driver.to_string(),
            role: "source",
        }),
    }
}

/// Builds the destination adapter for `driver`.
pub fn destination_adapter(driver: Driver) -> Result<Arc<dyn DestinationAdapter>, AdapterError> {
    match driver {
        Driver::Memory => Ok(Arc::new(MemoryDestination::new())),
        Driver::Postgres => Ok(Arc::new(PgDestination::new())),
        Driver::Csv => Err(AdapterError::UnsupportedRole {
            driver: driver.to_string(),
            role: "destination",
        }),
    }
}
