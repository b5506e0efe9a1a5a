//! Bounded concurrent mapping.
//!
//! Transformations run as blocking tasks on a process-wide tokio runtime. The
//! state cell keeps the join handles of in-flight tasks in input order; once
//! `max` are in flight the integrator waits for the oldest one, so results are
//! always pushed in input order no matter which task completes first.
//!
//! Waiting is done with `Runtime::block_on`, which tokio forbids on a thread
//! that is already driving a runtime. Such callers get `OpError::Runtime`
//! instead of a panic.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::gatherer::{Gatherer, Integrator};
use crate::traits::{Downstream, OpError};

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// The shared runtime, provided the current thread may block on it.
fn shared_runtime() -> Result<&'static Runtime, OpError> {
    if Handle::try_current().is_ok() {
        return Err(OpError::Runtime(
            "map_concurrent cannot wait for tasks from inside a tokio runtime".into(),
        ));
    }
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .thread_name("gatherflow-concurrent")
            .enable_time()
            .build()
            .map_err(|e| OpError::Runtime(e.to_string()))
    })
}

/// In-flight transformations, oldest first.
pub struct InFlight<R> {
    pending: VecDeque<JoinHandle<R>>,
}

impl<R> InFlight<R> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for the oldest task and push its result. `Ok(false)` if refused.
    fn emit_oldest(
        &mut self,
        runtime: &Runtime,
        downstream: &mut dyn Downstream<R>,
    ) -> Result<bool, OpError> {
        let Some(oldest) = self.pending.pop_front() else {
            return Ok(true);
        };
        let value = runtime
            .block_on(oldest)
            .map_err(|e| OpError::Concurrency(e.to_string()))?;
        Ok(downstream.push(value))
    }

    fn abort_all(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(aborted = self.pending.len(), "map_concurrent abort");
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

impl<R> Drop for InFlight<R> {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Apply `mapper` to each element with at most `max` transformations in flight.
pub fn map_concurrent<T, R, F>(max: NonZeroUsize, mapper: F) -> Gatherer<T, InFlight<R>, R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let max = max.get();
    let mapper = Arc::new(mapper);
    Gatherer::of_sequential_with_finisher(
        InFlight::new,
        Integrator::of(
            move |inflight: &mut InFlight<R>, element: T, downstream: &mut dyn Downstream<R>| {
                let runtime = shared_runtime()?;

                while inflight.len() >= max {
                    if !inflight.emit_oldest(runtime, downstream)? {
                        inflight.abort_all();
                        return Ok(false);
                    }
                }

                let mapper = Arc::clone(&mapper);
                inflight
                    .pending
                    .push_back(runtime.spawn_blocking(move || mapper(element)));

                // Flush whatever already completed at the head without waiting.
                while inflight
                    .pending
                    .front()
                    .is_some_and(|handle| handle.is_finished())
                {
                    if !inflight.emit_oldest(runtime, downstream)? {
                        inflight.abort_all();
                        return Ok(false);
                    }
                }
                Ok(true)
            },
        ),
        |mut inflight: InFlight<R>, downstream: &mut dyn Downstream<R>| {
            if inflight.is_empty() {
                return Ok(());
            }
            let runtime = shared_runtime()?;
            while !inflight.is_empty() {
                if !inflight.emit_oldest(runtime, downstream)? {
                    inflight.abort_all();
                    break;
                }
            }
            Ok(())
        },
    )
    .named("map_concurrent")
}
