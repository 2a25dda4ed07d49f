use crate::{
    error::SourceError,
    file::csv::{error::FileError, metadata::CsvHeader},
    source::{SourceAdapter, SourceHandle},
};
use async_trait::async_trait;
use csv::{Reader, ReaderBuilder, StringRecord};
use model::{
    core::value::Value,
    pagination::token::ResumeToken,
    records::{
        page::Page,
        record::{ColumnarRecord, Record, RecordShape},
    },
};
use std::fs::File;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CsvSettings {
    pub delimiter: u8,
    pub has_header: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: b',',
            has_header: true,
        }
    }
}

impl CsvSettings {
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self, FileError> {
        if !delimiter.is_ascii() {
            return Err(FileError::InvalidDelimiter(delimiter.to_string()));
        }
        self.delimiter = delimiter as u8;
        Ok(self)
    }
}

/// Paginated source over a CSV file. The query is the file path.
///
/// In columnar shape the header row names the columns; in tuple shape a
/// header row, when present, is skipped. Empty cells become `Null`, every
/// other cell is a string.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    settings: CsvSettings,
    shape: RecordShape,
}

impl CsvDataSource {
    pub fn new(settings: CsvSettings, shape: RecordShape) -> Self {
        CsvDataSource { settings, shape }
    }

    fn reader(&self, path: &str) -> Result<Reader<File>, FileError> {
        let file = File::open(path).map_err(|e| FileError::from_io(path, e))?;
        Ok(ReaderBuilder::new()
            .delimiter(self.settings.delimiter)
            .has_headers(self.settings.has_header)
            .from_reader(file))
    }
}

#[async_trait]
impl SourceAdapter for CsvDataSource {
    fn shape(&self) -> RecordShape {
        self.shape
    }

    async fn open(
        &self,
        query: &str,
        page_size: usize,
        resume: Option<&ResumeToken>,
    ) -> Result<Box<dyn SourceHandle>, SourceError> {
        let mut reader = self.reader(query).map_err(|e| match e {
            FileError::NotFound(_) | FileError::PermissionDenied(_) => {
                SourceError::Query(e.to_string())
            }
            other => SourceError::Connection(other.to_string()),
        })?;

        let header = if self.settings.has_header {
            let record = reader
                .headers()
                .map_err(|e| SourceError::Query(FileError::CsvError(e).to_string()))?;
            Some(CsvHeader::from_record(record))
        } else {
            None
        };

        if self.shape == RecordShape::Columnar && header.as_ref().is_none_or(|h| h.is_empty()) {
            return Err(SourceError::Query(
                FileError::InvalidFormat(format!(
                    "{query}: columnar records need a header row"
                ))
                .to_string(),
            ));
        }

        let offset = match resume {
            None => 0,
            Some(token) => token.as_offset().ok_or_else(|| {
                SourceError::Query("CSV source only resumes from offset tokens".into())
            })?,
        };

        let mut handle = CsvSourceHandle {
            reader: Some(reader),
            header,
            shape: self.shape,
            page_size: page_size.max(1),
            position: 0,
        };
        handle.skip(offset)?;

        info!(path = query, page_size, offset, "Opened CSV source");
        Ok(Box::new(handle))
    }
}

struct CsvSourceHandle {
    reader: Option<Reader<File>>,
    header: Option<CsvHeader>,
    shape: RecordShape,
    page_size: usize,
    /// Records consumed from the file, including skipped ones.
    position: u64,
}

impl CsvSourceHandle {
    fn skip(&mut self, offset: u64) -> Result<(), SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;
        let mut record = StringRecord::new();
        while self.position < offset {
            let more = reader
                .read_record(&mut record)
                .map_err(|e| SourceError::Page(FileError::CsvError(e).to_string()))?;
            if !more {
                break;
            }
            self.position += 1;
        }
        Ok(())
    }

    fn to_record(&self, row: &StringRecord) -> Record {
        let cell = |s: &str| {
            if s.is_empty() {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        };

        match (&self.shape, &self.header) {
            (RecordShape::Columnar, Some(header)) => header
                .columns
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.clone(), cell(value)))
                .collect::<ColumnarRecord>()
                .into(),
            _ => Record::tuple(row.iter().map(cell).collect()),
        }
    }
}

#[async_trait]
impl SourceHandle for CsvSourceHandle {
    async fn next_page(&mut self) -> Result<Option<Page>, SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;

        let mut rows = Vec::with_capacity(self.page_size);
        let mut row = StringRecord::new();
        while rows.len() < self.page_size {
            // Rows whose field count differs from the first row are rejected
            // by the reader, so a page never carries a torn record.
            let more = reader.read_record(&mut row).map_err(|e| {
                SourceError::Page(format!(
                    "record {}: {}",
                    self.position + rows.len() as u64,
                    FileError::CsvError(e)
                ))
            })?;
            if !more {
                break;
            }
            rows.push(row.clone());
        }

        if rows.is_empty() {
            return Ok(None);
        }

        self.position += rows.len() as u64;
        debug!(rows = rows.len(), position = self.position, "Read CSV page");

        let records = rows.iter().map(|r| self.to_record(r)).collect();
        Ok(Some(Page::new(records, self.page_size)))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}
