//! Per-conversation download session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::state::{DialogueState, StateMachine, TransitionError};
use crate::activation::ActivationCode;
use crate::download::handoff::Handoff;
use crate::transport::ChatId;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// State of one download dialogue.
///
/// Shared between the conversation handlers and the orchestrator through an
/// `Arc`. All locks are short-lived and never held across an await point.
#[derive(Debug)]
pub struct Session {
    id: u64,
    chat: ChatId,
    machine: Mutex<StateMachine>,
    pending: Mutex<Option<ActivationCode>>,
    confirmation_code: Handoff<String>,
    confirm_download: Handoff<bool>,
    buttons: Mutex<HashMap<String, bool>>,
    created_at: Instant,
}

impl Session {
    pub fn new(chat: ChatId) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            chat,
            machine: Mutex::new(StateMachine::new()),
            pending: Mutex::new(None),
            confirmation_code: Handoff::new(),
            confirm_download: Handoff::new(),
            buttons: Mutex::new(HashMap::new()),
            created_at: Instant::now(),
        }
    }

    /// Process-unique session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Time since the dialogue was triggered.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn state(&self) -> DialogueState {
        self.machine.lock().current()
    }

    /// State whose handler will receive the next text message.
    pub fn expected(&self) -> Option<DialogueState> {
        self.machine.lock().expected()
    }

    /// Route the next inbound message to `state`.
    pub fn expect(&self, state: DialogueState) -> Result<(), TransitionError> {
        self.machine.lock().expect(state)
    }

    pub fn transition(&self, state: DialogueState) -> Result<(), TransitionError> {
        self.machine.lock().transition(state)
    }

    /// Take and clear the pending expectation.
    pub fn take_expected(&self) -> Option<DialogueState> {
        self.machine.lock().take_expected()
    }

    /// Stop routing messages to this session.
    pub fn complete(&self) {
        self.machine.lock().complete();
    }

    pub fn finish(&self) {
        self.machine.lock().finish();
    }

    pub fn set_pending(&self, code: ActivationCode) {
        *self.pending.lock() = Some(code);
    }

    /// Apply `f` to the pending activation code, if there is one.
    pub fn update_pending<R>(&self, f: impl FnOnce(&mut ActivationCode) -> R) -> Option<R> {
        self.pending.lock().as_mut().map(f)
    }

    /// Hand the pending activation code over to a download attempt.
    pub fn take_pending(&self) -> Option<ActivationCode> {
        self.pending.lock().take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    pub fn confirmation_code(&self) -> &Handoff<String> {
        &self.confirmation_code
    }

    pub fn confirm_download(&self) -> &Handoff<bool> {
        &self.confirm_download
    }

    /// Register inline buttons; each maps its payload to the decision it stands for.
    pub fn register_buttons(&self, buttons: impl IntoIterator<Item = (String, bool)>) {
        self.buttons.lock().extend(buttons);
    }

    /// Resolve a button press. All registered buttons are dropped on the
    /// first press, so later presses of the same prompt resolve to `None`.
    pub fn press_button(&self, data: &str) -> Option<bool> {
        let mut buttons = self.buttons.lock();
        let decision = buttons.get(data).copied()?;
        buttons.clear();
        Some(decision)
    }

    pub fn clear_buttons(&self) {
        self.buttons.lock().clear();
    }
}
