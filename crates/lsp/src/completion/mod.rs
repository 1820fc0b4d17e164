//! Code completion: trigger detection, request lifecycle and result filtering.

mod controller;
pub mod filter;
mod session;
pub mod snippet;
pub mod trigger;

pub use controller::{CompletionController, CompletionRequest, CompletionResponseEvent, CompletionTrigger, response_items};
pub use filter::CompletionFilter;
pub use session::{Acceptance, CloseReason, CompletionSession, CompletionState, ReceiveOutcome, RefilterOutcome};
pub use trigger::{ChordParseError, KeyChord, Modifiers, TriggerSet};
