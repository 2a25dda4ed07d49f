use crate::{
    error::TransferError,
    source::paged::{NextPage, PagedSource},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

type PageResult = Result<NextPage, TransferError>;

/// Pages handed to the write stage, either fetched in line or by a
/// background task running at most one page ahead.
pub(crate) enum PageFeed<'a> {
    Inline(&'a mut PagedSource),
    Prefetched(mpsc::Receiver<PageResult>),
}

impl PageFeed<'_> {
    pub(crate) async fn next_page(&mut self) -> PageResult {
        match self {
            PageFeed::Inline(source) => source.next_page().await,
            PageFeed::Prefetched(rx) => match rx.recv().await {
                Some(next) => next,
                None => Err(TransferError::SourcePage {
                    records_yielded: 0,
                    message: "prefetch task stopped unexpectedly".into(),
                }),
            },
        }
    }
}

/// Moves `source` into a fetch task feeding a single-slot channel. The task
/// hands the source back once it reached the end, failed, or the receiver
/// went away.
pub(crate) fn spawn_prefetch(
    source: PagedSource,
) -> (mpsc::Receiver<PageResult>, JoinHandle<PagedSource>) {
    let (tx, rx) = mpsc::channel(1);
    let task = tokio::spawn(feed_pages(source, tx));
    (rx, task)
}

async fn feed_pages(mut source: PagedSource, tx: mpsc::Sender<PageResult>) -> PagedSource {
    loop {
        // Hold the slot before fetching so the task never runs more than one page ahead.
        let permit = match tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Write stage stopped, prefetch task exiting");
                break;
            }
        };

        let next = source.next_page().await;
        let last = !matches!(next, Ok(NextPage::Page(_)));
        if let Err(err) = &next {
            warn!(error = %err, "Prefetch fetch failed");
        }
        permit.send(next);
        if last {
            break;
        }
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::{MemorySource, SourceFailure};
    use model::{
        core::value::Value,
        records::record::{Record, RecordShape},
    };
    use std::time::Duration;

    fn tuples(n: i64) -> Vec<Record> {
        (0..n).map(|i| Record::tuple(vec![Value::Int(i)])).collect()
    }

    #[tokio::test]
    async fn runs_at_most_one_page_ahead() {
        let adapter = MemorySource::from_records(RecordShape::Tuple, tuples(10));
        let probe = adapter.probe();
        let source = PagedSource::open(&adapter, "q", 2, None, RecordShape::Tuple)
            .await
            .unwrap();

        let (rx, task) = spawn_prefetch(source);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // One page waits in the slot; the task is parked on the next reserve.
        assert_eq!(probe.pages_served(), 1);

        let mut feed = PageFeed::Prefetched(rx);
        let mut sizes = Vec::new();
        while let NextPage::Page(page) = feed.next_page().await.unwrap() {
            sizes.push(page.len());
        }
        assert_eq!(sizes, vec![2, 2, 2, 2, 2]);

        let source = task.await.unwrap();
        assert_eq!(source.records_yielded(), 10);
    }

    #[tokio::test]
    async fn failure_arrives_after_earlier_pages() {
        let adapter = MemorySource::from_records(RecordShape::Tuple, tuples(10)).with_failure(
            SourceFailure::Page {
                at: 2,
                message: "gone".into(),
            },
        );
        let source = PagedSource::open(&adapter, "q", 3, None, RecordShape::Tuple)
            .await
            .unwrap();

        let (rx, task) = spawn_prefetch(source);
        let mut feed = PageFeed::Prefetched(rx);
        assert!(matches!(feed.next_page().await, Ok(NextPage::Page(_))));
        assert!(matches!(feed.next_page().await, Ok(NextPage::Page(_))));
        let err = feed.next_page().await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::SourcePage {
                records_yielded: 6,
                ..
            }
        ));
        drop(feed);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_the_receiver_returns_the_source() {
        let adapter = MemorySource::from_records(RecordShape::Tuple, tuples(100));
        let probe = adapter.probe();
        let source = PagedSource::open(&adapter, "q", 1, None, RecordShape::Tuple)
            .await
            .unwrap();

        let (rx, task) = spawn_prefetch(source);
        drop(rx);
        let mut source = task.await.unwrap();
        source.close().await.unwrap();

        assert!(probe.pages_served() <= 1);
        assert_eq!(probe.closed(), 1);
    }
}
