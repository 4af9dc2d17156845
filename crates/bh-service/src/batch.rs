use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};

/// Run `op` over every item as an independent task and gather the results.
///
/// When `limit` is set, a permit is taken before each task is spawned and
/// held until it finishes, so at most `limit`'s capacity of items are in
/// flight. Every spawned task runs to completion. Results are slotted by
/// input position; the batch succeeds only if every slot is `Ok`, otherwise
/// it fails with the lowest-index error.
pub(crate) async fn fan_out<I, T, F, Fut>(
    op_name: &'static str,
    items: Vec<I>,
    limit: Option<&Arc<Semaphore>>,
    mut op: F,
) -> ServiceResult<Vec<T>>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = ServiceResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    debug!(op = op_name, total, "batch started");

    let mut handles = Vec::with_capacity(total);
    for item in items {
        let permit = match limit {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| ServiceError::TaskFailed(e.to_string()))?,
            ),
            None => None,
        };
        let fut = op(item);
        handles.push(tokio::spawn(async move {
            let result = fut.await;
            drop(permit);
            result
        }));
    }

    // Awaiting in input order still lets every task run concurrently; it
    // only fixes the order in which results are collected.
    let mut results = Vec::with_capacity(total);
    for handle in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ServiceError::TaskFailed(e.to_string())),
        };
        results.push(result);
    }

    collect(op_name, results)
}

fn collect<T>(op_name: &'static str, results: Vec<ServiceResult<T>>) -> ServiceResult<Vec<T>> {
    let total = results.len();
    let mut values = Vec::with_capacity(total);
    let mut first: Option<(usize, ServiceError)> = None;
    let mut failed = 0;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                failed += 1;
                if first.is_none() {
                    first = Some((index, e));
                }
            }
        }
    }

    match first {
        None => {
            debug!(op = op_name, total, "batch complete");
            Ok(values)
        }
        Some((index, source)) => {
            warn!(op = op_name, failed, total, index, error = %source, "batch failed");
            Err(ServiceError::Batch {
                index,
                failed,
                total,
                source: Box::new(source),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn boom(i: usize) -> ServiceError {
        ServiceError::InvalidArgument(format!("item {i}"))
    }

    #[tokio::test]
    async fn empty_batch_is_ok() {
        let out: Vec<usize> = fan_out("test", Vec::<usize>::new(), None, |i| async move { Ok(i) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        // Later items finish first.
        let items: Vec<u64> = (0..8).collect();
        let out = fan_out("test", items, None, |i| async move {
            tokio::time::sleep(Duration::from_millis((8 - i) * 5)).await;
            Ok(i * 10)
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn reports_lowest_index_error() {
        // Item 3 fails before item 1 does.
        let items: Vec<u64> = (0..5).collect();
        let err = fan_out("test", items, None, |i| async move {
            match i {
                1 => {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Err(boom(1))
                }
                3 => Err(boom(3)),
                _ => Ok(i),
            }
        })
        .await
        .unwrap_err();

        match err {
            ServiceError::Batch {
                index,
                failed,
                total,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(failed, 2);
                assert_eq!(total, 5);
                assert_eq!(source.to_string(), "invalid argument: item 1");
            }
            other => panic!("expected Batch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn siblings_run_to_completion_after_a_failure() {
        let done = Arc::new(AtomicUsize::new(0));
        let items: Vec<u64> = (0..6).collect();
        let err = fan_out("test", items, None, |i| {
            let done = Arc::clone(&done);
            async move {
                if i == 0 {
                    return Err(boom(0));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Batch { index: 0, .. }));
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn panicking_item_becomes_task_failure() {
        let items: Vec<u64> = (0..3).collect();
        let err = fan_out("test", items, None, |i| async move {
            if i == 2 {
                panic!("item exploded");
            }
            Ok(i)
        })
        .await
        .unwrap_err();
        match err {
            ServiceError::Batch { index, source, .. } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, ServiceError::TaskFailed(_)));
            }
            other => panic!("expected Batch, got {other:?}"),
        }
    }

    async fn peak_in_flight(limit: Option<&Arc<Semaphore>>, items: usize) -> usize {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        fan_out("test", (0..items).collect(), limit, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn limit_caps_in_flight_items() {
        let semaphore = Arc::new(Semaphore::new(4));
        assert_eq!(peak_in_flight(Some(&semaphore), 16).await, 4);
        assert_eq!(semaphore.available_permits(), 4);
    }

    #[tokio::test]
    async fn unbounded_runs_everything_at_once() {
        assert_eq!(peak_in_flight(None, 16).await, 16);
    }
}
