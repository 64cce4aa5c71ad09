//! Remote service clients for Kisan Mitra
//!
//! [`BackendGateway`] wraps the three farmer query endpoints and translates
//! every failure into [`kisan_core::Error::RemoteUnavailable`].
//! [`TranscriptionService`] turns recorded speech into input text.

pub mod base;
pub mod http;
pub mod transcription;

pub use base::{BackendGateway, ChatReply};
pub use http::HttpGateway;
pub use transcription::{SpeechToText, TranscriptionError, TranscriptionService};
