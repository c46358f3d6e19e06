//! Chat transport interface.
//!
//! The download flow talks to the user through a [`ChatTransport`]. The
//! transport is owned by the embedding bot; this crate only needs to send,
//! edit and delete messages, and to attach inline buttons to a message.
//! Button presses travel back through
//! [`DownloadFlow::handle_button`](crate::download::DownloadFlow::handle_button).
//!
//! The trait uses boxed futures so it stays dyn-compatible and can be driven
//! from the blocking engine thread through `Handle::block_on`.

mod memory;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use memory::{RecordingTransport, TransportEvent};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identity of one conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a message that was sent or received, usable for edits and deletes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat: ChatId,
    pub id: i64,
}

impl MessageHandle {
    pub fn new(chat: ChatId, id: i64) -> Self {
        Self { chat, id }
    }
}

/// One inline button attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    /// Label shown to the user.
    pub label: String,
    /// Opaque payload echoed back when the button is pressed.
    pub data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// An inbound text message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub handle: MessageHandle,
    pub text: String,
}

impl InboundMessage {
    pub fn new(handle: MessageHandle, text: impl Into<String>) -> Self {
        Self {
            handle,
            text: text.into(),
        }
    }

    pub fn chat(&self) -> ChatId {
        self.handle.chat
    }
}

/// Errors reported by a chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Sending a new message failed.
    #[error("failed to send message to chat {chat}: {reason}")]
    Send { chat: ChatId, reason: String },

    /// Editing an existing message failed.
    #[error("failed to edit message {id}: {reason}")]
    Edit { id: i64, reason: String },

    /// Deleting a message failed.
    #[error("failed to delete message {id}: {reason}")]
    Delete { id: i64, reason: String },
}

/// Outbound side of the conversation.
pub trait ChatTransport: Send + Sync + 'static {
    /// Send a plain text message.
    fn send<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>>;

    /// Send a message carrying one row of inline buttons.
    fn send_with_buttons<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
        buttons: &'a [InlineButton],
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>>;

    /// Replace the text of a message.
    fn edit<'a>(
        &'a self,
        message: &'a MessageHandle,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// Delete a message.
    fn delete<'a>(&'a self, message: &'a MessageHandle)
        -> BoxFuture<'a, Result<(), TransportError>>;
}
