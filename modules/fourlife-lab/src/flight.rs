use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

type SharedRun<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Coalesces concurrent work keyed by `K`: while a run for a key is in
/// flight, later callers await the same result instead of starting another.
///
/// An entry lives exactly as long as its run; the next call after
/// completion starts fresh work. Runs are driven on the runtime, so they
/// finish even if every caller goes away.
pub struct FlightGroup<K, V, E> {
    inflight: Arc<Mutex<HashMap<K, SharedRun<V, E>>>>,
}

impl<K, V, E> Default for FlightGroup<K, V, E> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Outcome of [`FlightGroup::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<T> {
    pub result: T,
    /// True when this caller attached to a run someone else started.
    pub joined: bool,
}

impl<K, V, E> FlightGroup<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `start()` for `key`, or join the run already in flight for it.
    /// `start` is only called when no run for `key` is in flight.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> Flight<Result<V, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (run, joined) = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(&key) {
                Some(existing) => (existing.clone(), true),
                None => {
                    let work = start();
                    let registry = Arc::clone(&self.inflight);
                    let owned_key = key.clone();
                    let run = async move {
                        let result = work.await;
                        // Entries are only inserted when absent, so this one is ours.
                        registry.lock().await.remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key, run.clone());
                    tokio::spawn(run.clone());
                    (run, false)
                }
            }
        };

        Flight {
            result: run.await,
            joined,
        }
    }

    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let group: FlightGroup<&'static str, u32, String> = FlightGroup::new();
        let starts = Arc::new(AtomicUsize::new(0));

        let start = |starts: Arc<AtomicUsize>| {
            move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(7)
                }
            }
        };

        let (a, b) = tokio::join!(
            group.run("ep_five_domain", start(starts.clone())),
            group.run("ep_five_domain", start(starts.clone())),
        );

        assert_eq!(a.result, Ok(7));
        assert_eq!(b.result, Ok(7));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(a.joined != b.joined);
        assert_eq!(group.in_flight().await, 0);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let group: FlightGroup<&'static str, &'static str, String> = FlightGroup::new();
        let (a, b) = tokio::join!(
            group.run("a", || async { Ok("a") }),
            group.run("b", || async { Ok("b") }),
        );
        assert_eq!(a.result, Ok("a"));
        assert_eq!(b.result, Ok("b"));
        assert!(!a.joined && !b.joined);
    }

    #[tokio::test]
    async fn completed_runs_are_not_reused() {
        let group: FlightGroup<u8, u32, String> = FlightGroup::new();
        let first = group.run(1, || async { Ok(1) }).await;
        let second = group.run(1, || async { Ok(2) }).await;
        assert_eq!(first.result, Ok(1));
        assert_eq!(second.result, Ok(2));
        assert!(!second.joined);
    }

    #[tokio::test]
    async fn abandoned_runs_still_finish_and_clear() {
        let group: FlightGroup<u8, u32, String> = FlightGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let counter = finished.clone();
        let caller = group.run(1, move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });
        // Poll once so the run is registered, then drop the caller.
        let _ = tokio::time::timeout(Duration::from_millis(1), caller).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(group.in_flight().await, 0);
    }

    #[tokio::test]
    async fn errors_are_shared_too() {
        let group: FlightGroup<u8, u32, String> = FlightGroup::new();
        let (a, b) = tokio::join!(
            group.run(1, || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err("boom".to_string())
            }),
            group.run(1, || async { Ok(0) }),
        );
        assert_eq!(a.result, Err("boom".to_string()));
        assert_eq!(b.result, Err("boom".to_string()));
    }
}
