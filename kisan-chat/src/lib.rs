//! Chat orchestration for Kisan Mitra
//!
//! [`ChatEngine`] owns the session list, the conversation view of the
//! active session and the in-flight sends, and drives the progressive
//! reveal of bot replies. Front ends call its async operations and redraw
//! from [`ChatEngine::snapshot`] when a [`ChatEvent`] arrives.

pub mod dispatcher;
pub mod engine;
pub mod history;
mod reveal;
pub mod state;

pub use dispatcher::{ChatDispatcher, Completion, SendOutcome, SendTicket};
pub use engine::{ChatEngine, EventSink, VOICE_UNSUPPORTED_NOTICE};
pub use history::load_history;
pub use kisan_core::events::ChatEvent;
pub use state::{ChatSnapshot, ChatState, PendingSend, SettledExchange};
