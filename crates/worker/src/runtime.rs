use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::TaskClass;
use crate::spawn::{spawn_blocking_on, spawn_on};

/// Runtime entrypoint for worker task execution.
///
/// Cheap to clone; components receive one at construction instead of
/// reaching for a global executor.
#[derive(Debug, Clone, Default)]
pub struct WorkerRuntime {
	handle: Option<Handle>,
}

impl WorkerRuntime {
	/// Binds to the tokio runtime the caller is running in, if any.
	///
	/// Without one, tasks go to whichever runtime is current when they are
	/// spawned.
	pub fn new() -> Self {
		Self {
			handle: Handle::try_current().ok(),
		}
	}

	/// Spawns an async task.
	pub fn spawn<F>(&self, class: TaskClass, fut: F) -> JoinHandle<F::Output>
	where
		F: Future + Send + 'static,
		F::Output: Send + 'static,
	{
		spawn_on(self.handle.as_ref(), class, fut)
	}

	/// Spawns blocking work.
	pub fn spawn_blocking<F, R>(&self, class: TaskClass, f: F) -> JoinHandle<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		spawn_blocking_on(self.handle.as_ref(), class, f)
	}

	/// Spawns a task that calls `tick` one `period` after each wake-up on
	/// `wake`, until `cancel` fires.
	///
	/// Wake-ups that arrive while a period is elapsing are coalesced into the
	/// following period, so `tick` runs at most once per `period`. The task is
	/// idle (no timer armed) while nobody wakes it.
	pub fn spawn_throttled<F>(&self, class: TaskClass, period: Duration, wake: Arc<Notify>, cancel: CancellationToken, mut tick: F) -> JoinHandle<()>
	where
		F: FnMut() + Send + 'static,
	{
		self.spawn(class, async move {
			loop {
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = wake.notified() => {}
				}
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(period) => {}
				}
				tick();
			}
			tracing::trace!(worker_class = class.as_str(), "worker.throttled.stopped");
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[tokio::test(start_paused = true)]
	async fn throttled_task_coalesces_wakes_within_period() {
		let rt = WorkerRuntime::new();
		let ticks = Arc::new(AtomicUsize::new(0));
		let wake = Arc::new(Notify::new());
		let cancel = CancellationToken::new();

		let counter = ticks.clone();
		let handle = rt.spawn_throttled(TaskClass::Background, Duration::from_secs(1), wake.clone(), cancel.clone(), move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		for _ in 0..10 {
			wake.notify_one();
		}
		tokio::time::sleep(Duration::from_millis(1500)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1, "idle without wakes");

		cancel.cancel();
		handle.await.expect("throttled task exits cleanly");
	}

	#[tokio::test(start_paused = true)]
	async fn cancelled_throttle_never_ticks() {
		let rt = WorkerRuntime::new();
		let ticks = Arc::new(AtomicUsize::new(0));
		let wake = Arc::new(Notify::new());
		let cancel = CancellationToken::new();

		let counter = ticks.clone();
		let handle = rt.spawn_throttled(TaskClass::Background, Duration::from_secs(1), wake.clone(), cancel.clone(), move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		wake.notify_one();
		tokio::time::sleep(Duration::from_millis(100)).await;
		cancel.cancel();
		handle.await.expect("throttled task exits cleanly");
		assert_eq!(ticks.load(Ordering::SeqCst), 0);
	}
}
