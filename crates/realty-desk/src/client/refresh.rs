use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use super::error::ApiError;

/// `Ok(None)` means the backend refused the refresh or no refresh token exists.
pub(crate) type RefreshOutcome = Result<Option<String>, ApiError>;

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Single-flight guard: callers arriving while a refresh is in flight await the
/// same pending result instead of issuing their own refresh call.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<PendingRefresh>,
}

impl RefreshCoordinator {
    pub(crate) async fn run<F>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let (generation, pending) = {
            let mut slot = self.slot.lock().expect("refresh slot poisoned");
            if let Some(pending) = slot.pending.clone() {
                (slot.generation, pending)
            } else {
                slot.generation += 1;
                let pending = start().shared();
                slot.pending = Some(pending.clone());
                (slot.generation, pending)
            }
        };

        let outcome = pending.await;

        let mut slot = self.slot.lock().expect("refresh slot poisoned");
        if slot.generation == generation {
            slot.pending = None;
        }
        outcome
    }

    #[cfg(test)]
    fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .expect("refresh slot poisoned")
            .pending
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::default());
        let starts = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();
        let gate = gate.shared();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let starts = starts.clone();
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .run(move || {
                        starts.fetch_add(1, Ordering::SeqCst);
                        async move {
                            let _ = gate.await;
                            Ok(Some("A2".to_string()))
                        }
                        .boxed()
                    })
                    .await
            }));
        }

        while !coordinator.in_flight() {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        release.send(()).expect("gate open");

        for handle in handles {
            let outcome = handle.await.expect("task joins").expect("refresh succeeds");
            assert_eq!(outcome.as_deref(), Some("A2"));
        }
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn settled_refresh_releases_the_slot() {
        let coordinator = RefreshCoordinator::default();
        let starts = AtomicUsize::new(0);

        for expected in ["A2", "A3"] {
            let outcome = coordinator
                .run(|| {
                    starts.fetch_add(1, Ordering::SeqCst);
                    let token = expected.to_string();
                    async move { Ok(Some(token)) }.boxed()
                })
                .await
                .expect("refresh succeeds");
            assert_eq!(outcome.as_deref(), Some(expected));
        }

        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }
}
