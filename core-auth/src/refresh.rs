//! Single-flight token refresh.
//!
//! Concurrent requests that hit a 401 share one refresh round-trip. The first
//! caller starts the refresh future; later callers clone the same
//! [`Shared`] handle and observe its outcome.

use crate::error::RefreshFailure;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

struct InFlight {
    generation: u64,
    future: RefreshFuture,
}

/// Coalesces refresh attempts into at most one in flight.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    slot: Mutex<Option<InFlight>>,
    generations: AtomicU64,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the refresh in flight, or start one with `start`.
    ///
    /// Resolves to the new access token.
    pub(crate) async fn run<F>(&self, start: F) -> Result<String, RefreshFailure>
    where
        F: FnOnce() -> BoxFuture<'static, Result<String, RefreshFailure>>,
    {
        let (generation, future) = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!(generation = in_flight.generation, "Joining refresh in flight");
                    (in_flight.generation, in_flight.future.clone())
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let future = start().shared();
                    *slot = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    debug!(generation, "Starting token refresh");
                    (generation, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.slot.lock().await;
        if slot
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            *slot = None;
        }

        outcome
    }

    #[cfg(test)]
    async fn is_idle(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}
