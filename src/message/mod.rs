//! Wire data model.
//!
//! ## Contents
//! - [`MessageKind`] the closed set of message types (enum-indexed dispatch)
//! - [`Message`] a decoded wire message
//! - [`Draft`] a partial message submitted for sending

mod draft;
mod kind;
#[allow(clippy::module_inception)]
mod message;

pub use draft::Draft;
pub use kind::MessageKind;
pub use message::{Message, Payload, new_message_id};
