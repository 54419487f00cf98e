//! Runtime abstraction layer for async operations
//!
//! The map core is single threaded and never awaits. Work that has to happen
//! out of band (tile bitmap fetches) is handed to an [`AsyncSpawner`], and its
//! results come back over a channel that the owning element drains on its
//! next frame.

pub mod debounce;

use futures::future::BoxFuture;

use crate::prelude::{Arc, Mutex};
use crate::{MapError, Result};

pub use debounce::{Debounced, Debouncer, Edge};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Hand `future` to the runtime. The future reports its own result.
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()>;
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;

        /// Tokio-based async spawner bound to a runtime handle
        #[derive(Debug, Clone)]
        pub struct TokioSpawner {
            handle: ::tokio::runtime::Handle,
        }

        impl TokioSpawner {
            pub fn new(handle: ::tokio::runtime::Handle) -> Self {
                Self { handle }
            }

            /// Binds to the runtime the caller is running inside
            pub fn current() -> Result<Self> {
                let handle = ::tokio::runtime::Handle::try_current()
                    .map_err(|e| MapError::Runtime(e.to_string()))?;
                Ok(Self::new(handle))
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()> {
                drop(self.handle.spawn(future));
                Ok(())
            }
        }
    }

    /// Drives each future to completion on the calling thread.
    ///
    /// Only suitable for fetchers that do not need a reactor (in-memory or
    /// file backed sources, tests).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct InlineSpawner;

    impl AsyncSpawner for InlineSpawner {
        fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()> {
            futures::executor::block_on(future);
            Ok(())
        }
    }

    /// Queues futures until the host pumps them with [`DeferredSpawner::run_pending`].
    ///
    /// Lets a frame-driven host decide when out-of-band work happens.
    #[derive(Default)]
    pub struct DeferredSpawner {
        queue: Mutex<Vec<BoxFuture<'static, ()>>>,
    }

    impl DeferredSpawner {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn len(&self) -> usize {
            self.queue.lock().map(|q| q.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Runs every queued future to completion, returning how many ran
        pub fn run_pending(&self) -> usize {
            let drained: Vec<_> = match self.queue.lock() {
                Ok(mut queue) => queue.drain(..).collect(),
                Err(_) => return 0,
            };
            let count = drained.len();
            for future in drained {
                futures::executor::block_on(future);
            }
            count
        }
    }

    impl AsyncSpawner for DeferredSpawner {
        fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()> {
            self.queue
                .lock()
                .map_err(|e| MapError::Runtime(e.to_string()))?
                .push(future);
            Ok(())
        }
    }
}

pub use spawners::{DeferredSpawner, InlineSpawner};
#[cfg(feature = "tokio-runtime")]
pub use spawners::tokio_impl::TokioSpawner;
