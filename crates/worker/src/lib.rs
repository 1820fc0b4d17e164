//! Worker task spawning shared by the language-server and editor crates.
//!
//! Every background task is tagged with a [`TaskClass`] so that traces show
//! which subsystem spawned it. Requests that can be superseded (completion,
//! highlighting) carry a [`GenerationToken`] minted from a [`GenerationClock`].

mod class;
mod runtime;
mod spawn;
mod token;

pub use class::TaskClass;
pub use runtime::WorkerRuntime;
pub use token::{GenerationClock, GenerationToken};
