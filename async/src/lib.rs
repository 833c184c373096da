//! Runtime-agnostic async primitives shared by the DTN crates.
//!
//! This crate provides thin abstractions over async runtime primitives to
//! enable potential future support for alternative runtimes (smol, Embassy,
//! etc.) while currently using tokio.
//!
//! # Example
//!
//! ```no_run
//! use dtn_async::task_pool::TaskPool;
//!
//! let pool = TaskPool::new();
//! let cancel = pool.cancel_token().clone();
//!
//! pool.spawn(async move {
//!     loop {
//!         tokio::select! {
//!             _ = do_work() => {}
//!             _ = cancel.cancelled() => break,
//!         }
//!     }
//! });
//!
//! # async fn do_work() {}
//! ```

extern crate alloc;

mod spawn;

pub mod bounded_task_pool;
pub mod cancellation_token;
pub mod join_handle;
pub mod notify;
pub mod sync;
pub mod task_pool;
pub mod time;

pub use bounded_task_pool::BoundedTaskPool;
pub use cancellation_token::CancellationToken;
pub use join_handle::JoinHandle;
pub use notify::Notify;
pub use task_pool::TaskPool;

#[cfg(feature = "tokio")]
pub use async_trait::async_trait;

/// Returns the number of threads of parallelism the host exposes, falling
/// back to 1 when this cannot be determined (or on `no_std` targets).
pub fn available_parallelism() -> core::num::NonZeroUsize {
    #[cfg(feature = "std")]
    {
        std::thread::available_parallelism().unwrap_or(core::num::NonZeroUsize::MIN)
    }
    #[cfg(not(feature = "std"))]
    {
        core::num::NonZeroUsize::MIN
    }
}
