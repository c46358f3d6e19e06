//! Conversation entry points for the download dialogue.
//!
//! `DownloadFlow` is what a chat front end talks to: it opens sessions,
//! routes each inbound text to the handler of the state the session expects,
//! resolves button presses, and hands a ready session to the orchestrator.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::orchestrator::{DownloadOrchestrator, DownloadOutcome, CONFIRMATION_CODE_PROMPT};
use crate::activation::ActivationCode;
use crate::conversation::{DialogueState, OpenSession, Session, SessionRegistry};
use crate::engine::EngineFactory;
use crate::error::{FlowError, FlowResult};
use crate::transport::{ChatId, ChatTransport, InboundMessage};

pub const ACTIVATION_CODE_PROMPT: &str = "Please send me the activation code.";
pub const INVALID_ACTIVATION_CODE_TEXT: &str = "Invalid activation code.";
pub const INVALID_CONFIRMATION_CODE_TEXT: &str = "Invalid confirmation code.";

/// What became of an inbound event.
#[derive(Debug)]
pub enum Dispatch {
    /// No session expected this input.
    Unhandled,
    /// The input was consumed.
    Handled,
    /// The input was rejected and the user was asked again.
    Reprompted(FlowError),
    /// The input completed the dialogue and a download attempt is running.
    DownloadStarted(JoinHandle<FlowResult<DownloadOutcome>>),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled)
    }
}

/// Download dialogue front door.
pub struct DownloadFlow<T: ChatTransport, F: EngineFactory> {
    orchestrator: Arc<DownloadOrchestrator<T, F>>,
}

impl<T: ChatTransport, F: EngineFactory> Clone for DownloadFlow<T, F> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

impl<T: ChatTransport, F: EngineFactory> DownloadFlow<T, F> {
    pub fn new(orchestrator: DownloadOrchestrator<T, F>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &Arc<DownloadOrchestrator<T, F>> {
        &self.orchestrator
    }

    fn registry(&self) -> &SessionRegistry {
        self.orchestrator.registry()
    }

    fn transport(&self) -> &T {
        self.orchestrator.transport()
    }

    /// Start the dialogue for `chat` and ask for an activation code.
    ///
    /// Fails with [`FlowError::Busy`] while a download for `chat` is in
    /// flight. A session still collecting input is replaced.
    pub async fn begin(&self, chat: ChatId) -> FlowResult<Arc<Session>> {
        let session = match self.registry().open(chat) {
            OpenSession::Busy(current) => {
                info!(chat = %chat, session = current.id(), "Download already in progress");
                return Err(FlowError::Busy);
            }
            OpenSession::Opened(session) => session,
            OpenSession::Replaced { session, previous } => {
                info!(
                    chat = %chat,
                    previous = previous.id(),
                    "Restarting download dialogue"
                );
                session
            }
        };

        self.prompt(&session, ACTIVATION_CODE_PROMPT, DialogueState::AwaitActivationCode)
            .await?;
        Ok(session)
    }

    /// The state the next text message from `chat` would be routed to.
    pub fn expected_input(&self, chat: ChatId) -> Option<DialogueState> {
        self.registry().get(chat)?.expected()
    }

    /// Route an inbound text message.
    pub async fn handle_text(&self, message: &InboundMessage) -> FlowResult<Dispatch> {
        let Some(session) = self.registry().get(message.chat()) else {
            return Ok(Dispatch::Unhandled);
        };
        // Clear the expectation before doing anything else, so a message
        // that arrives meanwhile is not routed here again.
        let Some(state) = session.take_expected() else {
            return Ok(Dispatch::Unhandled);
        };
        debug!(chat = %message.chat(), state = %state, "Dispatching message");

        match state {
            DialogueState::AwaitActivationCode => self.on_activation_code(&session, message).await,
            DialogueState::AwaitConfirmationCode => {
                self.on_confirmation_code(&session, message).await
            }
            DialogueState::AwaitConfirmationCodeDuringDownload => {
                self.on_confirmation_code_during_download(&session, message)
                    .await
            }
            DialogueState::Downloading | DialogueState::Done => Ok(Dispatch::Unhandled),
        }
    }

    /// Resolve an inline button press.
    pub async fn handle_button(&self, chat: ChatId, data: &str) -> FlowResult<Dispatch> {
        let Some(session) = self.registry().get(chat) else {
            return Ok(Dispatch::Unhandled);
        };
        let Some(decision) = session.press_button(data) else {
            debug!(chat = %chat, data, "Ignoring stale button press");
            return Ok(Dispatch::Unhandled);
        };
        if let Err(e) = session.confirm_download().deliver(decision) {
            warn!(chat = %chat, error = %e, "Dropping download decision");
            return Ok(Dispatch::Unhandled);
        }
        debug!(chat = %chat, decision, "Download decision delivered");
        Ok(Dispatch::Handled)
    }

    async fn on_activation_code(
        &self,
        session: &Arc<Session>,
        message: &InboundMessage,
    ) -> FlowResult<Dispatch> {
        let code = match ActivationCode::parse(&message.text) {
            Ok(code) => code,
            Err(e) => {
                debug!(chat = %session.chat(), error = %e, "Rejected activation code");
                self.prompt(
                    session,
                    INVALID_ACTIVATION_CODE_TEXT,
                    DialogueState::AwaitActivationCode,
                )
                .await?;
                return Ok(Dispatch::Reprompted(e.into()));
            }
        };
        debug!(chat = %session.chat(), activation_code = ?code, "Got activation code");

        let needs_code = code.needs_confirmation_code();
        session.set_pending(code);
        if needs_code {
            self.prompt(
                session,
                CONFIRMATION_CODE_PROMPT,
                DialogueState::AwaitConfirmationCode,
            )
            .await?;
            return Ok(Dispatch::Handled);
        }
        self.start_download(session)
    }

    async fn on_confirmation_code(
        &self,
        session: &Arc<Session>,
        message: &InboundMessage,
    ) -> FlowResult<Dispatch> {
        let text = message.text.trim();
        if text.is_empty() {
            self.prompt(
                session,
                INVALID_CONFIRMATION_CODE_TEXT,
                DialogueState::AwaitConfirmationCode,
            )
            .await?;
            return Ok(Dispatch::Reprompted(FlowError::InvalidConfirmationCode));
        }

        session
            .update_pending(|code| code.set_confirmation_code(text))
            .ok_or(FlowError::NotReady)?;
        self.start_download(session)
    }

    async fn on_confirmation_code_during_download(
        &self,
        session: &Arc<Session>,
        message: &InboundMessage,
    ) -> FlowResult<Dispatch> {
        let text = message.text.trim();
        if text.is_empty() {
            self.prompt(
                session,
                INVALID_CONFIRMATION_CODE_TEXT,
                DialogueState::AwaitConfirmationCodeDuringDownload,
            )
            .await?;
            return Ok(Dispatch::Reprompted(FlowError::InvalidConfirmationCode));
        }

        // Back to Downloading before the engine can resume and ask again.
        session.transition(DialogueState::Downloading)?;
        if let Err(e) = session.confirmation_code().deliver(text.to_string()) {
            warn!(chat = %session.chat(), error = %e, "Dropping confirmation code");
        }
        if let Err(e) = self.transport().delete(&message.handle).await {
            warn!(error = %e, "Failed to delete confirmation code message");
        }
        Ok(Dispatch::Handled)
    }

    fn start_download(&self, session: &Arc<Session>) -> FlowResult<Dispatch> {
        session.transition(DialogueState::Downloading)?;
        let orchestrator = Arc::clone(&self.orchestrator);
        let session = Arc::clone(session);
        let handle = tokio::spawn(async move { orchestrator.download(session).await });
        Ok(Dispatch::DownloadStarted(handle))
    }

    /// Send `text` and route the next message to `next`.
    ///
    /// A session that cannot reach its user is closed.
    async fn prompt(&self, session: &Arc<Session>, text: &str, next: DialogueState) -> FlowResult<()> {
        if let Err(e) = self.transport().send(session.chat(), text).await {
            warn!(chat = %session.chat(), error = %e, "Failed to send prompt, closing session");
            self.orchestrator.metrics().transport_failure();
            self.registry().remove(session);
            return Err(e.into());
        }
        session.expect(next)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadConfig;
    use crate::device::DeviceLocks;
    use crate::engine::{DownloadEngine, DownloadHooks, EngineError};
    use crate::transport::{MessageHandle, RecordingTransport};
    use tokio_util::sync::CancellationToken;

    struct NoopEngine;

    impl DownloadEngine for NoopEngine {
        fn download(
            &mut self,
            _cancel: &CancellationToken,
            _code: &ActivationCode,
            _hooks: &dyn DownloadHooks,
        ) -> Result<(), EngineError> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    struct NoopFactory;

    impl EngineFactory for NoopFactory {
        type Connection = ();
        type Engine = NoopEngine;

        fn open(&self, _connection: Arc<()>) -> Result<NoopEngine, EngineError> {
            Ok(NoopEngine)
        }
    }

    fn flow() -> (DownloadFlow<RecordingTransport, NoopFactory>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let locks = Arc::new(DeviceLocks::from_fn(|_| Ok(())));
        let orchestrator = DownloadOrchestrator::new(
            Arc::clone(&transport),
            Arc::new(NoopFactory),
            locks,
            DownloadConfig::default(),
        );
        (DownloadFlow::new(orchestrator), transport)
    }

    fn text(chat: i64, id: i64, body: &str) -> InboundMessage {
        InboundMessage::new(MessageHandle::new(ChatId(chat), id), body)
    }

    #[tokio::test]
    async fn test_begin_asks_for_activation_code() {
        let (flow, transport) = flow();
        flow.begin(ChatId(1)).await.unwrap();

        assert_eq!(transport.sent_texts(), vec![ACTIVATION_CODE_PROMPT]);
        assert_eq!(
            flow.expected_input(ChatId(1)),
            Some(DialogueState::AwaitActivationCode)
        );
    }

    #[tokio::test]
    async fn test_invalid_activation_code_reprompts() {
        let (flow, transport) = flow();
        let session = flow.begin(ChatId(1)).await.unwrap();

        let dispatch = flow.handle_text(&text(1, 10, "not a code")).await.unwrap();
        assert!(matches!(
            dispatch,
            Dispatch::Reprompted(FlowError::InvalidActivationCode(_))
        ));
        assert!(!session.has_pending());
        assert_eq!(
            transport.sent_texts().last().map(String::as_str),
            Some(INVALID_ACTIVATION_CODE_TEXT)
        );
        assert_eq!(
            flow.expected_input(ChatId(1)),
            Some(DialogueState::AwaitActivationCode)
        );
    }

    #[tokio::test]
    async fn test_code_requiring_confirmation_asks_for_it() {
        let (flow, transport) = flow();
        let session = flow.begin(ChatId(1)).await.unwrap();

        let dispatch = flow
            .handle_text(&text(1, 10, "LPA:1$smdp.example.com$ABC123$OID$1"))
            .await
            .unwrap();
        assert!(matches!(dispatch, Dispatch::Handled));
        assert!(session.has_pending());
        assert_eq!(
            transport.sent_texts().last().map(String::as_str),
            Some(CONFIRMATION_CODE_PROMPT)
        );

        let dispatch = flow.handle_text(&text(1, 11, "   ")).await.unwrap();
        assert!(matches!(
            dispatch,
            Dispatch::Reprompted(FlowError::InvalidConfirmationCode)
        ));
        assert_eq!(
            flow.expected_input(ChatId(1)),
            Some(DialogueState::AwaitConfirmationCode)
        );
    }

    #[tokio::test]
    async fn test_unexpected_text_is_unhandled() {
        let (flow, _transport) = flow();
        let dispatch = flow.handle_text(&text(7, 1, "hello")).await.unwrap();
        assert!(!dispatch.is_handled());
    }

    #[tokio::test]
    async fn test_second_message_is_not_routed_to_consumed_state() {
        let (flow, _transport) = flow();
        let session = flow.begin(ChatId(1)).await.unwrap();

        session.take_expected();
        let dispatch = flow.handle_text(&text(1, 10, "LPA:1$a$b")).await.unwrap();
        assert!(matches!(dispatch, Dispatch::Unhandled));
    }

    #[tokio::test]
    async fn test_restart_replaces_idle_session() {
        let (flow, _transport) = flow();
        let first = flow.begin(ChatId(1)).await.unwrap();
        let second = flow.begin(ChatId(1)).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.state(), DialogueState::Done);
    }

    #[tokio::test]
    async fn test_failed_prompt_closes_session() {
        let (flow, transport) = flow();
        transport.fail_sends(true);

        let err = flow.begin(ChatId(1)).await.unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert!(flow.orchestrator().registry().is_empty());
    }

    #[tokio::test]
    async fn test_stale_button_press_is_ignored() {
        let (flow, _transport) = flow();
        flow.begin(ChatId(1)).await.unwrap();

        let dispatch = flow.handle_button(ChatId(1), "0:Yes").await.unwrap();
        assert!(matches!(dispatch, Dispatch::Unhandled));
    }
}
