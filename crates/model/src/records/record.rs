use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which record variant a run operates on. Resolved once, at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordShape {
    Tuple,
    Columnar,
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordShape::Tuple => f.write_str("tuple"),
            RecordShape::Columnar => f.write_str("columnar"),
        }
    }
}

/// Positional row: values bind by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleRecord {
    pub values: Vec<Value>,
}

impl TupleRecord {
    pub fn new(values: Vec<Value>) -> Self {
        TupleRecord { values }
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

/// Named-column row. Field order is kept as emitted by the source,
/// lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarRecord {
    pub fields: Vec<FieldValue>,
}

impl ColumnarRecord {
    pub fn new() -> Self {
        ColumnarRecord { fields: Vec::new() }
    }

    /// Inserts a field, replacing an earlier field with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.value = value,
            None => self.fields.push(FieldValue { name, value }),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| &f.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for ColumnarRecord {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut record = ColumnarRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// One logical row from the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Tuple(TupleRecord),
    Columnar(ColumnarRecord),
}

impl Record {
    pub fn tuple(values: Vec<Value>) -> Self {
        Record::Tuple(TupleRecord::new(values))
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            Record::Tuple(_) => RecordShape::Tuple,
            Record::Columnar(_) => RecordShape::Columnar,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Record::Tuple(t) => t.values.iter().map(Value::size_bytes).sum(),
            Record::Columnar(c) => c
                .fields
                .iter()
                .map(|f| f.name.len() + f.value.size_bytes())
                .sum(),
        }
    }

    /// Stable byte form used for batch checksums.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl From<TupleRecord> for Record {
    fn from(value: TupleRecord) -> Self {
        Record::Tuple(value)
    }
}

impl From<ColumnarRecord> for Record {
    fn from(value: ColumnarRecord) -> Self {
        Record::Columnar(value)
    }
}
