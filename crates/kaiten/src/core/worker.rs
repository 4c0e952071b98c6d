//! Module for owning the execution context row tasks run on.

use std::future::Future;
use std::io;

use tokio::runtime::{Builder, Handle, Runtime};

/// A handle to the dedicated tokio runtime a worker drives its batches on.
///
/// Blocking callers wait through [`WorkerRuntime::block_on`], which keeps
/// suspension entirely inside the worker. Row tasks are always spawned on this
/// runtime, whichever entry point submitted them.
///
/// # Example
///
/// ```ignore
/// let runtime = WorkerRuntime::new(4)?;
/// let answer = runtime.block_on(async { 41 + 1 });
/// assert_eq!(answer, 42);
///
/// // Runtime threads are released when the handle is dropped
/// ```
pub(crate) struct WorkerRuntime {
    /// The owned runtime, becomes `None` after shutdown is initiated
    runtime: Option<Runtime>,

    /// Handle used to spawn and block, valid for as long as the runtime lives
    handle: Handle,
}

impl WorkerRuntime {
    /// Builds a multi-threaded runtime with `threads` worker threads.
    ///
    /// # Parameters
    ///
    /// * `threads` - Number of runtime threads, clamped to at least one
    pub fn new(threads: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .thread_name("kaiten-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs `future` to completion on the calling thread.
    ///
    /// The future is polled by a plain executor with this runtime's context
    /// entered, so timers and sockets it creates are driven by the worker threads.
    /// Legal on any thread, including `spawn_blocking` threads and threads that
    /// belong to another runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let _context = self.handle.enter();
        futures::executor::block_on(future)
    }

    /// Stops the runtime without waiting for outstanding tasks.
    ///
    /// Safe to call more than once and from inside an async context.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }
}

impl Drop for WorkerRuntime {
    /// Ensures runtime threads are released when the handle is dropped.
    fn drop(&mut self) {
        self.shutdown();
    }
}
