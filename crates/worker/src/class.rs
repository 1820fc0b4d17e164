/// What a spawned task is for; recorded on every spawn trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work the user is waiting on: outbound notifications, completion requests.
	Interactive,
	/// Deferred work: throttled full syncs, highlight passes.
	Background,
	/// Filesystem walks and other blocking calls.
	IoBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
		}
	}
}
