//! In-memory transport that records every call.
//!
//! Used by the test suites and handy for embedding the flow in tools that
//! render messages themselves. Individual operations can be made to fail to
//! exercise the transport-failure paths.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

use super::{BoxFuture, ChatId, ChatTransport, InlineButton, MessageHandle, TransportError};

/// A recorded transport call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Sent {
        message: MessageHandle,
        text: String,
        buttons: Vec<InlineButton>,
    },
    Edited {
        message: MessageHandle,
        text: String,
    },
    Deleted {
        message: MessageHandle,
    },
}

/// Transport that keeps a log of calls instead of talking to a chat service.
#[derive(Debug)]
pub struct RecordingTransport {
    next_id: AtomicI64,
    events: Mutex<Vec<TransportEvent>>,
    fail_sends: AtomicBool,
    fail_edits: AtomicBool,
    fail_deletes: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            events: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            fail_edits: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent edits fail (or succeed again).
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail (or succeed again).
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().clone()
    }

    /// Texts of all sent messages, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Sent { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of all edits applied to `message`, in order.
    pub fn edits_of(&self, message: &MessageHandle) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Edited { message: m, text } if m == message => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether `message` has been deleted.
    pub fn was_deleted(&self, message: &MessageHandle) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| matches!(event, TransportEvent::Deleted { message: m } if m == message))
    }

    /// The most recent message sent with buttons, if any.
    pub fn last_button_message(&self) -> Option<(MessageHandle, Vec<InlineButton>)> {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                TransportEvent::Sent {
                    message, buttons, ..
                } if !buttons.is_empty() => Some((*message, buttons.clone())),
                _ => None,
            })
    }

    /// Handle of the first message whose text starts with `prefix`.
    pub fn find_sent(&self, prefix: &str) -> Option<MessageHandle> {
        self.events.lock().iter().find_map(|event| match event {
            TransportEvent::Sent { message, text, .. } if text.starts_with(prefix) => {
                Some(*message)
            }
            _ => None,
        })
    }

    fn record_send(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<MessageHandle, TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send {
                chat,
                reason: "send disabled".to_string(),
            });
        }
        let message = MessageHandle::new(chat, self.next_id.fetch_add(1, Ordering::SeqCst));
        self.events.lock().push(TransportEvent::Sent {
            message,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(message)
    }
}

impl ChatTransport for RecordingTransport {
    fn send<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>> {
        Box::pin(async move { self.record_send(chat, text, &[]) })
    }

    fn send_with_buttons<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
        buttons: &'a [InlineButton],
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>> {
        Box::pin(async move { self.record_send(chat, text, buttons) })
    }

    fn edit<'a>(
        &'a self,
        message: &'a MessageHandle,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            if self.fail_edits.load(Ordering::SeqCst) {
                return Err(TransportError::Edit {
                    id: message.id,
                    reason: "edit disabled".to_string(),
                });
            }
            self.events.lock().push(TransportEvent::Edited {
                message: *message,
                text: text.to_string(),
            });
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        message: &'a MessageHandle,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(TransportError::Delete {
                    id: message.id,
                    reason: "delete disabled".to_string(),
                });
            }
            self.events.lock().push(TransportEvent::Deleted { message: *message });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_send_edit_delete() {
        let transport = RecordingTransport::new();
        let chat = ChatId(7);

        let message = transport.send(chat, "hello").await.unwrap();
        transport.edit(&message, "hello again").await.unwrap();
        transport.delete(&message).await.unwrap();

        assert_eq!(transport.sent_texts(), vec!["hello".to_string()]);
        assert_eq!(transport.edits_of(&message), vec!["hello again".to_string()]);
        assert!(transport.was_deleted(&message));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let transport = RecordingTransport::new();
        let chat = ChatId(7);
        let message = transport.send(chat, "hello").await.unwrap();

        transport.fail_edits(true);
        assert!(matches!(
            transport.edit(&message, "x").await,
            Err(TransportError::Edit { .. })
        ));

        transport.fail_sends(true);
        assert!(transport.send(chat, "again").await.is_err());
        assert_eq!(transport.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn test_message_ids_are_unique() {
        let transport = RecordingTransport::new();
        let a = transport.send(ChatId(1), "a").await.unwrap();
        let b = transport
            .send_with_buttons(ChatId(1), "b", &[InlineButton::new("Yes", "y")])
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(transport.last_button_message().map(|(m, _)| m), Some(b));
    }
}
