//! End-to-end tests for saga runs, retries and batched imports.

#[cfg(test)]
mod tests {
    use crate::batch::BatchedSaga;
    use crate::errors::SagaError;
    use crate::events::{names, CollectingEventSink};
    use crate::reporting::CollectingErrorReporter;
    use crate::retry::{RecordingSleeper, RetryPolicy};
    use crate::saga::{RunOutcome, Saga, Step};
    use crate::testing::{CallLog, FlakyOperation, InMemoryBatchStore, InjectedFailure};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    /// Builds `n` logged steps; `fail_at` makes that operation fail and
    /// `broken_compensations` makes those compensations fail.
    fn logged_saga(
        log: &CallLog,
        n: usize,
        fail_at: Option<usize>,
        broken_compensations: &[usize],
    ) -> Saga<String> {
        let mut saga = Saga::new();
        for i in 0..n {
            let op_log = log.clone();
            let comp_log = log.clone();
            let fail_op = fail_at == Some(i);
            let fail_comp = broken_compensations.contains(&i);
            saga.add_step(
                move || async move {
                    op_log.record(format!("op:{i}"));
                    if fail_op {
                        return Err(SagaError::terminal_msg(format!("step {i} exploded")));
                    }
                    Ok(format!("result-{i}"))
                },
                move || async move {
                    comp_log.record(format!("comp:{i}"));
                    if fail_comp {
                        return Err(SagaError::terminal_msg(format!("undo {i} exploded")));
                    }
                    Ok(())
                },
            );
        }
        saga
    }

    #[tokio::test]
    async fn test_results_match_steps_in_order() {
        for n in [1, 2, 5, 12] {
            let log = CallLog::new();
            let result = logged_saga(&log, n, None, &[]).run().await;

            let expected: Vec<String> = (0..n).map(|i| format!("result-{i}")).collect();
            assert_eq!(result.results().map(<[String]>::to_vec), Some(expected));
            assert_eq!(result.completed_count, n);
            assert!(log.entries_with_prefix("comp").is_empty());
        }
    }

    #[tokio::test]
    async fn test_rollback_covers_exactly_completed_steps() {
        for k in 0..6 {
            let log = CallLog::new();
            let result = logged_saga(&log, 6, Some(k), &[]).run().await;

            let expected: Vec<String> = (0..k).rev().map(|i| format!("comp:{i}")).collect();
            assert_eq!(log.entries_with_prefix("comp"), expected);
            assert_eq!(result.completed_count, k);
            assert!(!log.entries().contains(&format!("comp:{k}")));
            assert!(!log.entries().contains(&format!("op:{}", k + 1)));
        }
    }

    #[tokio::test]
    async fn test_every_compensation_attempted_when_some_fail() {
        let log = CallLog::new();
        let result = logged_saga(&log, 5, Some(4), &[3, 1]).run().await;

        assert_eq!(
            log.entries_with_prefix("comp"),
            vec!["comp:3", "comp:2", "comp:1", "comp:0"]
        );
        match result.outcome {
            RunOutcome::Failed { step, index, error } => {
                assert_eq!(step, "step-4");
                assert_eq!(index, 4);
                assert_eq!(error.to_string(), "terminal: step 4 exploded");
            }
            RunOutcome::Succeeded { .. } => panic!("saga should have failed"),
        }
    }

    #[tokio::test]
    async fn test_three_steps_all_succeed() {
        let log = CallLog::new();
        let result = logged_saga(&log, 3, None, &[]).run().await;

        assert!(result.succeeded());
        assert_eq!(result.completed_count, 3);
    }

    #[tokio::test]
    async fn test_third_step_failure_compensates_second_then_first() {
        let log = CallLog::new();
        let result = logged_saga(&log, 3, Some(2), &[]).run().await;

        assert!(!result.succeeded());
        assert_eq!(result.completed_count, 2);
        assert_eq!(
            log.entries(),
            vec!["op:0", "op:1", "op:2", "comp:1", "comp:0"]
        );
    }

    #[tokio::test]
    async fn test_onboarding_flow_with_retried_invitation() {
        let log = CallLog::new();
        let mailer = Arc::new(FlakyOperation::new(2));
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::linear(3, Duration::from_millis(10))
            .with_sleeper(sleeper.clone())
            .with_label("send_invitation");

        let mut saga = Saga::new();
        let (op_log, comp_log) = (log.clone(), log.clone());
        saga.add_named_step(
            "create_org",
            move || async move {
                op_log.record("create_org");
                Ok(1)
            },
            move || async move {
                comp_log.record("delete_org");
                Ok(())
            },
        );
        let op_log = log.clone();
        saga.push(Step::read_only("assign_role", move || async move {
            op_log.record("assign_role");
            Ok(2)
        }));
        let op_mailer = Arc::clone(&mailer);
        saga.add_named_step(
            "send_invitation",
            move || async move {
                policy
                    .execute_with(|| op_mailer.call(), SagaError::is_terminal)
                    .await
            },
            || async { Ok(()) },
        );

        let result = saga.run().await;

        assert_eq!(result.results(), Some(&[1, 2, 3][..]));
        assert_eq!(mailer.calls(), 3);
        assert_eq!(sleeper.delays_ms(), vec![10, 20]);
        assert_eq!(log.entries(), vec!["create_org", "assign_role"]);
    }

    #[tokio::test]
    async fn test_exhausted_retry_fails_step_and_reports_once() {
        let log = CallLog::new();
        let reporter = Arc::new(CollectingErrorReporter::new());
        let mailer = Arc::new(FlakyOperation::always_failing());
        let policy = RetryPolicy::linear(3, Duration::from_millis(10))
            .with_sleeper(Arc::new(RecordingSleeper::new()))
            .with_reporter(reporter.clone())
            .with_label("send_invitation");

        let mut saga = Saga::new();
        let comp_log = log.clone();
        saga.add_named_step(
            "create_org",
            || async { Ok(0) },
            move || async move {
                comp_log.record("delete_org");
                Ok(())
            },
        );
        let op_mailer = Arc::clone(&mailer);
        saga.add_named_step(
            "send_invitation",
            move || async move {
                policy
                    .execute_with(|| op_mailer.call(), SagaError::is_terminal)
                    .await
            },
            || async { Ok(()) },
        );

        let result = saga.run().await;

        assert_eq!(mailer.calls(), 3);
        assert_eq!(result.failed_step(), Some("send_invitation"));
        assert!(result.error().unwrap().is_retryable());
        assert_eq!(log.entries(), vec!["delete_org"]);
        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.reports()[0].context, "send_invitation");
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Onboarded {
        Org(u64),
        Profile(String),
        Role(&'static str),
    }

    #[tokio::test]
    async fn test_mixed_step_outputs_through_enum() {
        let log = CallLog::new();
        let mut saga: Saga<Onboarded> = Saga::new();

        let comp_log = log.clone();
        saga.push(Step::with_output(
            "create_org",
            || async { Ok(Onboarded::Org(42)) },
            move |output: Onboarded| async move {
                if let Onboarded::Org(id) = output {
                    comp_log.record(format!("delete_org:{id}"));
                }
                Ok(())
            },
        ));
        let comp_log = log.clone();
        saga.push(Step::with_output(
            "create_profile",
            || async { Ok(Onboarded::Profile("ada".to_string())) },
            move |output: Onboarded| async move {
                if let Onboarded::Profile(name) = output {
                    comp_log.record(format!("delete_profile:{name}"));
                }
                Ok(())
            },
        ));
        saga.add_named_step(
            "assign_role",
            || async { Err::<Onboarded, _>(SagaError::terminal_msg("role missing")) },
            || async { Ok(()) },
        );

        let result = saga.run().await;

        assert_eq!(result.completed_count, 2);
        assert_eq!(log.entries(), vec!["delete_profile:ada", "delete_org:42"]);

        let mut saga: Saga<Onboarded> = Saga::new();
        saga.add_step(|| async { Ok(Onboarded::Org(1)) }, || async { Ok(()) })
            .add_step(|| async { Ok(Onboarded::Role("admin")) }, || async { Ok(()) });
        assert_eq!(
            saga.run().await.into_result().unwrap(),
            vec![Onboarded::Org(1), Onboarded::Role("admin")]
        );
    }

    #[tokio::test]
    async fn test_independent_sagas_run_concurrently() {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                tokio::spawn(async move {
                    let log = CallLog::new();
                    let fail_at = (n % 2 == 1).then_some(n / 2);
                    let result = logged_saga(&log, 4, fail_at, &[]).run().await;
                    (n, result.completed_count, log.len())
                })
            })
            .collect();

        for handle in handles {
            let (n, completed, calls) = handle.await.unwrap();
            if n % 2 == 1 {
                let k = n / 2;
                assert_eq!(completed, k);
                assert_eq!(calls, k + 1 + k);
            } else {
                assert_eq!(completed, 4);
                assert_eq!(calls, 4);
            }
        }
    }

    #[tokio::test]
    async fn test_batched_import_events_and_rollback() {
        let store = Arc::new(InMemoryBatchStore::<u32>::new());
        store.fail_insert_call(1, InjectedFailure::Terminal);
        let sink = Arc::new(CollectingEventSink::new());
        let batched = BatchedSaga::new(Arc::clone(&store), 10)
            .unwrap()
            .with_event_sink(sink.clone());

        let result = batched.import((0..25).collect::<Vec<u32>>()).await.unwrap();

        assert_eq!(result.completed_count, 1);
        assert_eq!(store.removed_batches(), vec![(1..=10).collect::<Vec<u64>>()]);
        assert_eq!(
            sink.event_types(),
            vec![
                names::SAGA_STARTED,
                names::STEP_COMPLETED,
                names::STEP_FAILED,
                names::COMPENSATION_COMPLETED,
                names::SAGA_ROLLED_BACK,
            ]
        );
        let completed = sink.events_of_type(names::COMPENSATION_COMPLETED);
        assert_eq!(completed[0].1.as_ref().unwrap()["step"], "batch-0");
    }
}
