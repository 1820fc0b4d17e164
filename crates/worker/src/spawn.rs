use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Spawns `fut` on `handle`, or on the runtime the caller is running in.
///
/// # Panics
///
/// Without a handle, panics when called outside a tokio runtime, like
/// [`tokio::spawn`].
pub(crate) fn spawn_on<F>(handle: Option<&Handle>, class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	match handle {
		Some(handle) => handle.spawn(fut),
		None => tokio::spawn(fut),
	}
}

/// Blocking counterpart of [`spawn_on`].
pub(crate) fn spawn_blocking_on<F, R>(handle: Option<&Handle>, class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	match handle {
		Some(handle) => handle.spawn_blocking(f),
		None => tokio::task::spawn_blocking(f),
	}
}
