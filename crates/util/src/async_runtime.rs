//! Async runtime helpers for blocking callers.
//!
//! Model nodes are evaluated synchronously on the host's thread, while the
//! HTTP stack is async. This module provides a single entry point for driving
//! those futures to completion from synchronous code.

use std::future::Future;
use std::panic;
use std::thread;

use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::task;

/// Execute an async future from synchronous code, blocking the caller.
///
/// # Arguments
/// - `future`: The future to run to completion.
///
/// # Returns
/// Returns the future's output, or an error converted from the I/O failure
/// raised when a Tokio runtime cannot be created.
///
/// # Notes
/// - Reuses the current runtime when it is multi-threaded.
/// - Inside a current-thread runtime the future runs on a scoped helper
///   thread, since that runtime cannot be blocked in place.
/// - Falls back to a single-threaded runtime for call sites outside Tokio.
pub fn block_on_future<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: From<std::io::Error> + Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => thread::scope(|scope| {
            scope
                .spawn(|| run_on_fresh_runtime(future))
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload))
        }),
        Err(_) => run_on_fresh_runtime(future),
    }
}

fn run_on_fresh_runtime<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<std::io::Error>,
{
    Builder::new_current_thread().enable_all().build()?.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn answer() -> Result<u32, std::io::Error> {
        tokio::task::yield_now().await;
        Ok(42)
    }

    #[test]
    fn runs_outside_any_runtime() {
        assert_eq!(block_on_future(answer()).expect("future completes"), 42);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn runs_inside_a_current_thread_runtime() {
        assert_eq!(block_on_future(answer()).expect("future completes"), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_inside_a_multi_thread_runtime() {
        assert_eq!(block_on_future(answer()).expect("future completes"), 42);
    }
}
