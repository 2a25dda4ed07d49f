use crate::records::record::Record;
use xxhash_rust::xxh3::xxh3_64_with_seed;

#[derive(Debug, Clone)]
pub struct Batch {
    /// Monotonic per run, starting at 1.
    pub seq: u64,
    /// Stream offset of the first record (resume offset included).
    pub start_offset: u64,
    pub records: Vec<Record>,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Manifest {
    pub row_count: usize,
    pub checksum_xxh3: u64, // rolling checksum over canonicalized records
}

pub fn manifest_for(records: &[Record]) -> Manifest {
    let mut h: u64 = 0;
    for r in records {
        h = xxh3_64_with_seed(&r.canonical_bytes(), h);
    }
    Manifest {
        row_count: records.len(),
        checksum_xxh3: h,
    }
}

impl Batch {
    pub fn new(seq: u64, start_offset: u64, records: Vec<Record>) -> Self {
        let manifest = manifest_for(&records);
        Batch {
            seq,
            start_offset,
            records,
            manifest,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offset just past the last record of this batch.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.records.len() as u64
    }

    pub fn size_bytes(&self) -> usize {
        self.records.iter().map(|r| r.size_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    #[test]
    fn manifest_depends_on_order() {
        let a = Record::tuple(vec![Value::Int(1)]);
        let b = Record::tuple(vec![Value::Int(2)]);

        let forward = manifest_for(&[a.clone(), b.clone()]);
        let reversed = manifest_for(&[b, a]);

        assert_eq!(forward.row_count, 2);
        assert_ne!(forward.checksum_xxh3, reversed.checksum_xxh3);
    }

    #[test]
    fn end_offset_counts_records() {
        let batch = Batch::new(3, 10, vec![Record::tuple(vec![]); 4]);
        assert_eq!(batch.end_offset(), 14);
        assert_eq!(batch.manifest.row_count, 4);
    }
}
