#[cfg(test)]
mod tests {
    use crate::utils::{
        CancelOnPage, TABLE, committed_ids, destination, paged, replicator, run, tuple_config,
        tuples,
    };
    use connectors::memory::{DestinationFailure, MemorySource, SourceFailure};
    use engine_processing::{ErrorKind, ReplicatorStatus, TransferStatus};
    use model::records::record::RecordShape;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    // Scenario: the bulk insert of the second batch is rejected.
    // Expected Outcome: the first batch stays committed, the run fails on batch 2.
    #[traced_test]
    #[tokio::test]
    async fn tc01_insert_failure_keeps_earlier_batches() {
        let dest = destination().with_failure(DestinationFailure::Insert {
            call: 2,
            row_index: Some(1),
            message: "duplicate key value".into(),
        });
        let source =
            MemorySource::from_pages(RecordShape::Tuple, paged(tuples(0, 12), &[3, 4, 5]));

        let result = run(source, &dest, tuple_config().with_batch_size(5)).await;

        assert_eq!(result.status, TransferStatus::Failed);
        assert_eq!(result.batches_committed, 1);
        assert_eq!(result.records_committed, 5);
        assert_eq!(result.last_committed_batch, Some(1));
        assert!(result.records_committed < result.records_read);
        assert_eq!(result.resume_offset, 5);

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Write);
        assert_eq!(error.batch, Some(2));
        assert_eq!(error.row_index, Some(1));
        assert_eq!(committed_ids(&dest).await, vec![0, 1, 2, 3, 4]);
        assert!(logs_contain("Transfer failed"));
    }

    // Scenario: the commit of the third batch fails.
    // Expected Outcome: commit error naming batch 3; the staged rows never show up.
    #[tokio::test]
    async fn tc02_commit_failure_is_atomic() {
        let dest = destination().with_failure(DestinationFailure::Commit {
            call: 3,
            message: "could not serialize access".into(),
        });
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 20));

        let result = run(source, &dest, tuple_config().with_batch_size(4)).await;

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Commit);
        assert_eq!(error.batch, Some(3));
        assert_eq!(result.records_committed, 8);
        assert_eq!(dest.committed_rows(TABLE).await.len(), 8);
    }

    // Scenario: the source fails fetching its third page.
    // Expected Outcome: source page error carrying the records yielded so far;
    // batches completed before the failure remain committed.
    #[tokio::test]
    async fn tc03_source_failure_reports_yielded_records() {
        let dest = destination();
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 30)).with_failure(
            SourceFailure::Page {
                at: 2,
                message: "cursor expired".into(),
            },
        );

        let result = run(
            source,
            &dest,
            tuple_config().with_batch_size(4).with_page_size(5),
        )
        .await;

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::SourcePage);
        assert_eq!(error.records_yielded, Some(10));
        assert_eq!(result.records_read, 10);
        assert_eq!(result.records_committed, 8);
        assert_eq!(dest.commit_sizes().await, vec![4, 4]);
    }

    // Scenario: the source rejects the query.
    // Expected Outcome: query error, the destination is never contacted.
    #[tokio::test]
    async fn tc04_rejected_query() {
        let dest = destination();
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 3))
            .with_failure(SourceFailure::Query("relation does not exist".into()));

        let result = run(source, &dest, tuple_config()).await;

        assert_eq!(result.error.unwrap().kind, ErrorKind::Query);
        assert!(dest.calls().await.is_empty());
    }

    // Scenario: success, write failure and cancellation.
    // Expected Outcome: both handles are closed on every path.
    #[tokio::test]
    async fn tc05_handles_closed_on_every_path() {
        // success
        let dest = destination();
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 7));
        let probe = source.probe();
        assert!(run(source, &dest, tuple_config().with_batch_size(3)).await.is_completed());
        assert_eq!((probe.opened(), probe.closed()), (1, 1));
        assert_eq!(dest.open_handles().await, 0);

        // failure
        let dest = destination().with_failure(DestinationFailure::Insert {
            call: 1,
            row_index: None,
            message: "boom".into(),
        });
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 7));
        let probe = source.probe();
        assert!(!run(source, &dest, tuple_config()).await.is_completed());
        assert_eq!((probe.opened(), probe.closed()), (1, 1));
        assert_eq!(dest.open_handles().await, 0);

        // cancellation
        let dest = destination();
        let token = CancellationToken::new();
        let inner = MemorySource::from_records(RecordShape::Tuple, tuples(0, 7));
        let probe = inner.probe();
        let result = replicator(
            CancelOnPage::new(inner, token.clone(), 0),
            &dest,
            tuple_config().with_batch_size(2).with_page_size(2),
        )
        .with_cancellation(token)
        .run()
        .await;
        assert!(result.was_cancelled());
        assert_eq!((probe.opened(), probe.closed()), (1, 1));
        assert_eq!(dest.open_handles().await, 0);
    }

    // Scenario: cancellation is requested while the second page is served.
    // Expected Outcome: the run stops after the next commit, counters stay exact.
    #[traced_test]
    #[tokio::test]
    async fn tc06_cancellation_stops_at_batch_boundary() {
        let dest = destination();
        let token = CancellationToken::new();
        let inner = MemorySource::from_records(RecordShape::Tuple, tuples(0, 10));

        let mut replicator = replicator(
            CancelOnPage::new(inner, token.clone(), 1),
            &dest,
            tuple_config().with_batch_size(3).with_page_size(5),
        )
        .with_cancellation(token);
        let result = replicator.run().await;

        assert_eq!(replicator.status(), ReplicatorStatus::Failed);
        assert_eq!(result.status, TransferStatus::Failed);
        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::Cancelled);
        assert_eq!(result.records_read, 10);
        assert_eq!(result.records_committed, 6);
        assert_eq!(result.batches_committed, 2);
        assert_eq!(dest.commit_sizes().await, vec![3, 3]);
        assert_eq!(result.resume_offset, 6);
        assert!(logs_contain("Transfer cancelled"));
    }

    // Scenario: the same source replicated with and without prefetch.
    // Expected Outcome: identical commits and content.
    #[tokio::test]
    async fn tc07_prefetch_matches_sequential() {
        let mut outcomes = Vec::new();
        for prefetch in [false, true] {
            let dest = destination();
            let source = MemorySource::from_pages(
                RecordShape::Tuple,
                paged(tuples(0, 31), &[3, 0, 11, 4, 13]),
            );
            let result = run(
                source,
                &dest,
                tuple_config().with_batch_size(5).with_prefetch(prefetch),
            )
            .await;

            assert!(result.is_completed());
            outcomes.push((result, dest.commit_sizes().await, committed_ids(&dest).await));
        }

        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[1].1, vec![5, 5, 5, 5, 5, 5, 1]);
    }

    // Scenario: prefetch mode with a source failing on its fourth page.
    // Expected Outcome: the failure surfaces after exactly the batches the
    // three good pages completed.
    #[tokio::test]
    async fn tc08_prefetch_reports_source_failure_in_order() {
        let dest = destination();
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 40)).with_failure(
            SourceFailure::Page {
                at: 3,
                message: "connection reset".into(),
            },
        );
        let probe = source.probe();

        let result = run(
            source,
            &dest,
            tuple_config()
                .with_batch_size(4)
                .with_page_size(5)
                .with_prefetch(true),
        )
        .await;

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::SourcePage);
        assert_eq!(error.records_yielded, Some(15));
        assert_eq!(dest.commit_sizes().await, vec![4, 4, 4]);
        assert_eq!(result.records_committed, 12);
        assert_eq!(probe.closed(), 1);
    }

    // Scenario: prefetch mode with a failing insert.
    // Expected Outcome: the fetch task stops, the source is closed.
    #[tokio::test]
    async fn tc09_prefetch_stops_fetching_after_write_failure() {
        let dest = destination().with_failure(DestinationFailure::Insert {
            call: 1,
            row_index: None,
            message: "disk full".into(),
        });
        let source = MemorySource::from_records(RecordShape::Tuple, tuples(0, 100));
        let probe = source.probe();

        let result = run(
            source,
            &dest,
            tuple_config()
                .with_batch_size(2)
                .with_page_size(2)
                .with_prefetch(true),
        )
        .await;

        assert_eq!(result.error.unwrap().kind, ErrorKind::Write);
        assert!(probe.pages_served() <= 3);
        assert_eq!(probe.closed(), 1);
        assert_eq!(dest.open_handles().await, 0);
    }

    // Scenario: a failed run is resumed from its reported offset.
    // Expected Outcome: the second run continues after the committed records;
    // together both runs commit every record exactly once.
    #[tokio::test]
    async fn tc10_resume_from_reported_offset() {
        let dest = destination().with_failure(DestinationFailure::Insert {
            call: 3,
            row_index: None,
            message: "timeout".into(),
        });
        let records = tuples(0, 17);

        let first = run(
            MemorySource::from_records(RecordShape::Tuple, records.clone()),
            &dest,
            tuple_config().with_batch_size(5),
        )
        .await;
        assert_eq!(first.resume_offset, 10);

        let second = run(
            MemorySource::from_records(RecordShape::Tuple, records),
            &dest,
            tuple_config()
                .with_batch_size(5)
                .with_resume_offset(first.resume_offset),
        )
        .await;

        assert!(second.is_completed());
        assert_eq!(second.records_read, 7);
        assert_eq!(second.resume_offset, 17);
        assert_eq!(committed_ids(&dest).await, (0..17).collect::<Vec<_>>());
    }
}
