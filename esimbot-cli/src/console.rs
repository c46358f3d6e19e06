//! Chat transport over the terminal.
//!
//! Bot messages are printed to stdout with their message id; inline buttons
//! are shown as `[Label]` and pressed by typing the label.

use std::sync::atomic::{AtomicI64, Ordering};

use esimbot::transport::{
    BoxFuture, ChatId, ChatTransport, InlineButton, MessageHandle, TransportError,
};
use parking_lot::Mutex;

/// Buttons of the message currently showing them.
#[derive(Debug)]
struct ButtonMessage {
    message: MessageHandle,
    buttons: Vec<InlineButton>,
}

#[derive(Debug)]
pub struct ConsoleTransport {
    next_id: AtomicI64,
    buttons: Mutex<Option<ButtonMessage>>,
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            buttons: Mutex::new(None),
        }
    }

    /// Payload of the on-screen button labelled `input`, ignoring case.
    pub fn button_for(&self, input: &str) -> Option<String> {
        let input = input.trim();
        self.buttons.lock().as_ref().and_then(|shown| {
            shown
                .buttons
                .iter()
                .find(|button| button.label.eq_ignore_ascii_case(input))
                .map(|button| button.data.clone())
        })
    }

    fn next_handle(&self, chat: ChatId) -> MessageHandle {
        MessageHandle::new(chat, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn print_message(header: &str, text: &str) {
    let mut lines = text.lines();
    println!("{} {}", header, lines.next().unwrap_or_default());
    for line in lines {
        println!("{:width$} {}", "", line, width = header.chars().count());
    }
}

impl ChatTransport for ConsoleTransport {
    fn send<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>> {
        Box::pin(async move {
            let message = self.next_handle(chat);
            print_message(&format!("bot #{}>", message.id), text);
            Ok(message)
        })
    }

    fn send_with_buttons<'a>(
        &'a self,
        chat: ChatId,
        text: &'a str,
        buttons: &'a [InlineButton],
    ) -> BoxFuture<'a, Result<MessageHandle, TransportError>> {
        Box::pin(async move {
            let message = self.next_handle(chat);
            print_message(&format!("bot #{}>", message.id), text);
            let labels: Vec<String> = buttons
                .iter()
                .map(|button| format!("[{}]", button.label))
                .collect();
            println!("{}  (type a button label to press it)", labels.join(" "));
            *self.buttons.lock() = Some(ButtonMessage {
                message,
                buttons: buttons.to_vec(),
            });
            Ok(message)
        })
    }

    fn edit<'a>(
        &'a self,
        message: &'a MessageHandle,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            print_message(&format!("bot #{} (edited)>", message.id), text);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, message: &'a MessageHandle) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let mut buttons = self.buttons.lock();
            if buttons.as_ref().is_some_and(|shown| shown.message == *message) {
                *buttons = None;
            }
            println!("bot #{} (deleted)", message.id);
            Ok(())
        })
    }
}
