use crate::records::record::Record;

/// One fetch unit returned by a paginated source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Page size requested from the source. Batching only uses it to size
    /// the pending buffer, never to decide where a batch ends.
    pub size_hint: usize,
}

impl Page {
    pub fn new(records: Vec<Record>, size_hint: usize) -> Self {
        Page { records, size_hint }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for Page {
    fn from(records: Vec<Record>) -> Self {
        let size_hint = records.len();
        Page { records, size_hint }
    }
}
