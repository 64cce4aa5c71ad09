//! Display-side transforms: markdown fragments and timed reveal

pub mod markdown;
pub mod reveal;
pub mod sanitize;

pub use markdown::{transform, Block, Document, Inline};
pub use reveal::{RevealFrame, RevealScheduler, RevealStream};
pub use sanitize::{strip_control_chars, SafeHtml};
