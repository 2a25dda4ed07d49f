use model::records::{batch::Batch, record::Record};

/// Collects records across page boundaries and cuts them into batches of
/// `batch_size`. Page boundaries never force a flush; only `finish` emits a
/// short batch. The pending buffer grows one page hint at a time instead of
/// being sized for a whole batch up front.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    next_seq: u64,
    next_offset: u64,
    pending: Vec<Record>,
}

impl BatchAccumulator {
    /// `start_offset` is the stream offset of the first record pushed.
    pub fn new(batch_size: usize, start_offset: u64) -> Self {
        let batch_size = batch_size.max(1);
        BatchAccumulator {
            batch_size,
            next_seq: 1,
            next_offset: start_offset,
            pending: Vec::new(),
        }
    }

    /// Makes room for a page of about `size_hint` records, capped at what
    /// the open batch still needs.
    pub fn reserve_page(&mut self, size_hint: usize) {
        let room = self.batch_size - self.pending.len();
        self.pending.reserve(size_hint.min(room));
    }

    pub fn push(&mut self, record: Record) -> Option<Batch> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            return Some(self.cut());
        }
        None
    }

    /// Emits the remainder, if any, as a final batch.
    pub fn finish(&mut self) -> Option<Batch> {
        (!self.pending.is_empty()).then(|| self.cut())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn cut(&mut self) -> Batch {
        let records = std::mem::take(&mut self.pending);
        let batch = Batch::new(self.next_seq, self.next_offset, records);
        self.next_seq += 1;
        self.next_offset = batch.end_offset();
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    fn record(i: i64) -> Record {
        Record::tuple(vec![Value::Int(i)])
    }

    fn run(pages: &[usize], batch_size: usize) -> Vec<Batch> {
        let mut acc = BatchAccumulator::new(batch_size, 0);
        let mut batches = Vec::new();
        let mut next = 0i64;
        for &len in pages {
            for _ in 0..len {
                batches.extend(acc.push(record(next)));
                next += 1;
            }
        }
        batches.extend(acc.finish());
        batches
    }

    #[test]
    fn batches_span_pages() {
        let batches = run(&[3, 4, 5], 5);
        let sizes: Vec<_> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);

        let seqs: Vec<_> = batches.iter().map(|b| b.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let offsets: Vec<_> = batches.iter().map(|b| b.start_offset).collect();
        assert_eq!(offsets, vec![0, 5, 10]);
    }

    #[test]
    fn empty_pages_are_ignored() {
        let sizes: Vec<_> = run(&[0, 2, 0, 0, 1], 5).iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3]);
        assert!(run(&[0, 0], 5).is_empty());
    }

    #[test]
    fn exact_multiple_leaves_no_remainder() {
        let mut acc = BatchAccumulator::new(2, 10);
        assert!(acc.push(record(0)).is_none());
        let batch = acc.push(record(1)).unwrap();
        assert_eq!(batch.start_offset, 10);
        assert_eq!(acc.pending(), 0);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn page_hint_reserves_at_most_the_open_batch() {
        let mut acc = BatchAccumulator::new(5000, 0);
        acc.reserve_page(10);
        assert!(acc.pending.capacity() >= 10 && acc.pending.capacity() < 5000);

        let mut acc = BatchAccumulator::new(4, 0);
        acc.push(record(0));
        acc.reserve_page(100);
        assert!(acc.pending.capacity() >= 4);
        assert!(acc.pending.capacity() < 100);
    }

    #[test]
    fn batching_does_not_depend_on_page_size() {
        let expected: Vec<_> = run(&[23], 5).iter().map(|b| b.manifest).collect();
        for pages in [vec![1; 23], vec![7, 7, 7, 2], vec![23]] {
            let got: Vec<_> = run(&pages, 5).iter().map(|b| b.manifest).collect();
            assert_eq!(got, expected);
        }
    }
}
