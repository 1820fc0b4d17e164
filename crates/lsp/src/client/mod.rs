//! Client side of a language server connection.
//!
//! [`ClientHandle`] is the cheap, cloneable entry point the rest of the crate talks
//! to. Notifications are enqueued on a single ordered queue and drained by one pump
//! task, so the server observes them in the order the editor produced them.

mod encoding;
mod handle;
mod recording;
mod transport;

pub use encoding::OffsetEncoding;
pub use handle::ClientHandle;
pub use recording::{Recorded, RecordingTransport, ScriptedCompletion};
pub use transport::{LspTransport, Notification};
