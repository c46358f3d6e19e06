//! Download orchestration.
//!
//! Runs one engine attempt per session: posts the status message, takes the
//! device lock, runs the blocking engine under a deadline, and turns engine
//! callbacks into chat prompts and chat replies back into callback results.
//!
//! ```text
//!  async task                                 blocking thread
//!  ──────────                                 ───────────────
//!  send "⏳ Downloading"
//!  acquire device lock
//!  spawn_blocking ──────────────────────────► engine.download(hooks)
//!  select { engine done | deadline }              │ progress ──► edit status
//!      │ deadline: cancel token ───────────►      │ code?    ──► prompt, wait handoff
//!      ▼                                          │ confirm? ──► buttons, wait handoff
//!  final status edit  ◄────────────────────── engine.close()
//!                                             release lock, clear session
//! ```

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::progress::{ProgressReporter, DOWNLOADING_TEXT};
use super::prompt::ConfirmPrompt;
use crate::activation::ActivationCode;
use crate::config::DownloadConfig;
use crate::conversation::{DialogueState, Session, SessionRegistry};
use crate::device::{DeviceGuard, DeviceLocks};
use crate::engine::{
    DownloadEngine, DownloadHooks, DownloadProgress, EngineError, EngineFactory, ProfileMetadata,
};
use crate::error::{FlowError, FlowResult};
use crate::telemetry::DownloadMetrics;
use crate::transport::{ChatTransport, MessageHandle, TransportError};

/// Prompt sent when a confirmation code is needed.
pub const CONFIRMATION_CODE_PROMPT: &str = "Please send me the confirmation code.";

/// Final status after a successful install.
pub const SUCCESS_TEXT: &str = "Congratulations! Your profile has been downloaded. /profiles";

/// Final status after the user declined.
pub const CANCELED_TEXT: &str = "Download canceled.";

/// Final status text for a failed attempt.
pub fn failure_text(error: &FlowError) -> String {
    format!("Failed to download profile. Error: {}", error)
}

/// Normal end of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The profile was installed.
    Installed,
    /// The user declined the profile.
    Declined,
}

/// Why the attempt's cancellation token fired. The first reason wins.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AbortReason {
    Timeout,
    Transport(TransportError),
}

#[derive(Debug, Default)]
struct AbortCell(Mutex<Option<AbortReason>>);

impl AbortCell {
    fn record(&self, reason: AbortReason) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(reason);
        }
    }

    fn get(&self) -> Option<AbortReason> {
        self.0.lock().clone()
    }
}

/// Closes the engine after the attempt, including when it panics.
struct CloseOnDrop<E: DownloadEngine>(E);

impl<E: DownloadEngine> Drop for CloseOnDrop<E> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Evicts the session when the attempt ends, on every path.
struct SessionCleanup {
    registry: Arc<SessionRegistry>,
    session: Arc<Session>,
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        self.session.clear_buttons();
        self.session.confirmation_code().disarm();
        self.session.confirm_download().disarm();
        self.registry.remove(&self.session);
    }
}

/// What a running attempt holds until its engine returns.
///
/// Fields drop in declaration order: the device lock is released before the
/// session is evicted.
struct AttemptHold<C> {
    device: DeviceGuard<C>,
    _session: SessionCleanup,
}

/// Drives download attempts for one device.
pub struct DownloadOrchestrator<T: ChatTransport, F: EngineFactory> {
    transport: Arc<T>,
    factory: Arc<F>,
    locks: Arc<DeviceLocks<F::Connection>>,
    registry: Arc<SessionRegistry>,
    metrics: Arc<DownloadMetrics>,
    config: DownloadConfig,
}

impl<T: ChatTransport, F: EngineFactory> DownloadOrchestrator<T, F> {
    pub fn new(
        transport: Arc<T>,
        factory: Arc<F>,
        locks: Arc<DeviceLocks<F::Connection>>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            transport,
            factory,
            locks,
            registry: Arc::new(SessionRegistry::new()),
            metrics: Arc::new(DownloadMetrics::new()),
            config,
        }
    }

    /// Share an existing metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<DownloadMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn locks(&self) -> &Arc<DeviceLocks<F::Connection>> {
        &self.locks
    }

    pub fn metrics(&self) -> &Arc<DownloadMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Run one download attempt for `session`.
    ///
    /// The session must hold a pending activation code and be in
    /// [`DialogueState::Downloading`]. Whatever happens, the device lock is
    /// released and then the session is evicted before the final status edit.
    /// Dropping the future cancels the engine. The lock and the session are
    /// then held until the engine thread returns.
    pub async fn download(&self, session: Arc<Session>) -> FlowResult<DownloadOutcome> {
        let cleanup = SessionCleanup {
            registry: Arc::clone(&self.registry),
            session: Arc::clone(&session),
        };

        if session.state() != DialogueState::Downloading {
            return Err(FlowError::NotReady);
        }
        let code = session.take_pending().ok_or(FlowError::NotReady)?;

        self.metrics.attempt_started();
        let started = Instant::now();
        info!(
            chat = %session.chat(),
            session = session.id(),
            device = %self.config.device,
            "Starting profile download"
        );

        let status = match self.transport.send(session.chat(), DOWNLOADING_TEXT).await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Failed to send download status message");
                self.metrics.transport_failure();
                return Err(e.into());
            }
        };

        let hold = AttemptHold {
            device: self.locks.acquire(&self.config.device).await,
            _session: cleanup,
        };
        let result = self.run_attempt(&session, hold, code, status).await;

        let final_text = match &result {
            Ok(DownloadOutcome::Installed) => SUCCESS_TEXT.to_string(),
            Ok(DownloadOutcome::Declined) => CANCELED_TEXT.to_string(),
            Err(e) => failure_text(e),
        };
        let edited = self.transport.edit(&status, &final_text).await;
        self.record_outcome(&result);

        info!(
            chat = %session.chat(),
            session = session.id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            session_age_ms = session.age().as_millis() as u64,
            outcome = ?result,
            "Profile download finished"
        );

        match (result, edited) {
            (Ok(DownloadOutcome::Installed), Err(e)) => {
                error!(error = %e, "Failed to report successful download");
                Err(e.into())
            }
            (result, Err(e)) => {
                warn!(error = %e, "Failed to edit final download status");
                result
            }
            (result, Ok(())) => result,
        }
    }

    async fn run_attempt(
        &self,
        session: &Arc<Session>,
        hold: AttemptHold<F::Connection>,
        code: ActivationCode,
        status: MessageHandle,
    ) -> FlowResult<DownloadOutcome> {
        let connection = self.locks.connection(&hold.device)?;
        let engine = self
            .factory
            .open(connection)
            .map_err(|e| FlowError::Failed(e.to_string()))?;

        let cancel = CancellationToken::new();
        // Dropping this future stops the engine too.
        let _cancel_on_drop = cancel.clone().drop_guard();
        let abort = Arc::new(AbortCell::default());

        let hooks = InteractiveHooks {
            runtime: Handle::current(),
            transport: Arc::clone(&self.transport),
            session: Arc::clone(session),
            status,
            reporter: Mutex::new(ProgressReporter::new()),
            cancel: cancel.clone(),
            abort: Arc::clone(&abort),
            metrics: Arc::clone(&self.metrics),
        };

        debug!(activation_code = ?code, "Invoking download engine");
        let engine_cancel = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            // Declared first so it drops after the engine closes.
            let _hold = hold;
            let mut engine = CloseOnDrop(engine);
            engine.0.download(&engine_cancel, &code, &hooks)
        });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = tokio::time::sleep(self.config.timeout) => {
                warn!(
                    timeout_secs = self.config.timeout.as_secs(),
                    "Download deadline exceeded, cancelling engine"
                );
                abort.record(AbortReason::Timeout);
                cancel.cancel();
                (&mut task).await
            }
        };
        cancel.cancel();

        let engine_result = joined.map_err(|e| {
            error!(error = %e, "Download engine panicked");
            FlowError::Failed(format!("download engine aborted: {}", e))
        })?;

        match (engine_result, abort.get()) {
            (Ok(()), _) => Ok(DownloadOutcome::Installed),
            (Err(_), Some(AbortReason::Timeout)) => Err(FlowError::Timeout {
                secs: self.config.timeout.as_secs(),
            }),
            (Err(_), Some(AbortReason::Transport(e))) => Err(FlowError::Transport(e)),
            (Err(EngineError::Canceled), None) => Ok(DownloadOutcome::Declined),
            (Err(e), None) => {
                error!(error = %e, "Failed to download profile");
                Err(FlowError::Failed(e.to_string()))
            }
        }
    }

    fn record_outcome(&self, result: &FlowResult<DownloadOutcome>) {
        match result {
            Ok(DownloadOutcome::Installed) => self.metrics.installed(),
            Ok(DownloadOutcome::Declined) => self.metrics.declined(),
            Err(FlowError::Timeout { .. }) => self.metrics.timed_out(),
            Err(FlowError::Transport(_)) => self.metrics.transport_failure(),
            Err(_) => self.metrics.failed(),
        }
    }
}

/// Engine callbacks bridged onto the conversation.
///
/// Runs on the blocking engine thread and re-enters the runtime through
/// `Handle::block_on` for chat I/O and handoff waits.
struct InteractiveHooks<T: ChatTransport> {
    runtime: Handle,
    transport: Arc<T>,
    session: Arc<Session>,
    status: MessageHandle,
    reporter: Mutex<ProgressReporter>,
    cancel: CancellationToken,
    abort: Arc<AbortCell>,
    metrics: Arc<DownloadMetrics>,
}

impl<T: ChatTransport> InteractiveHooks<T> {
    fn escalate(&self, error: TransportError) {
        self.abort.record(AbortReason::Transport(error));
        self.cancel.cancel();
    }

    fn delete_quietly(&self, message: &MessageHandle, what: &str) {
        if let Err(e) = self.runtime.block_on(self.transport.delete(message)) {
            warn!(error = %e, message = message.id, "Failed to delete {}", what);
        }
    }
}

impl<T: ChatTransport> DownloadHooks for InteractiveHooks<T> {
    fn progress(&self, progress: DownloadProgress) {
        let Some(text) = self.reporter.lock().advance(progress) else {
            return;
        };
        debug!(progress = %progress, "Download progress");
        match self.runtime.block_on(self.transport.edit(&self.status, &text)) {
            Ok(()) => self.metrics.progress_edit(),
            Err(e) => {
                error!(error = %e, "Failed to edit download progress, cancelling");
                self.escalate(e);
            }
        }
    }

    fn confirmation_code(&self) -> String {
        self.metrics.confirmation_code_prompt();
        let prompt = match self
            .runtime
            .block_on(self.transport.send(self.session.chat(), CONFIRMATION_CODE_PROMPT))
        {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(error = %e, "Failed to send confirmation code prompt");
                self.escalate(e);
                return String::new();
            }
        };

        // Arm before routing input, so the handler never finds the slot closed.
        self.session.confirmation_code().arm();
        if let Err(e) = self
            .session
            .expect(DialogueState::AwaitConfirmationCodeDuringDownload)
        {
            error!(error = %e, "Cannot wait for confirmation code");
            self.session.confirmation_code().disarm();
            self.delete_quietly(&prompt, "confirmation code prompt");
            return String::new();
        }

        let code = self
            .runtime
            .block_on(self.session.confirmation_code().take(&self.cancel));

        if code.is_none() {
            // Cancelled while waiting: stop routing replies into this attempt.
            self.session.complete();
            let _ = self.session.transition(DialogueState::Downloading);
        }
        self.delete_quietly(&prompt, "confirmation code prompt");
        debug!(received = code.is_some(), "Confirmation code wait finished");
        code.unwrap_or_default()
    }

    fn confirm_download(&self, metadata: &ProfileMetadata) -> bool {
        self.metrics.confirm_download_prompt();
        let prompt = ConfirmPrompt::new(metadata);
        let buttons = prompt.buttons();

        self.session.register_buttons(prompt.decisions());
        self.session.confirm_download().arm();

        let message = match self.runtime.block_on(self.transport.send_with_buttons(
            self.session.chat(),
            prompt.text(),
            &buttons,
        )) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to send profile metadata");
                self.session.confirm_download().disarm();
                self.session.clear_buttons();
                self.escalate(e);
                return false;
            }
        };

        let confirmed = self
            .runtime
            .block_on(self.session.confirm_download().take(&self.cancel))
            .unwrap_or(false);

        self.session.clear_buttons();
        self.delete_quietly(&message, "confirmation prompt");
        debug!(confirmed, metadata = ?metadata, "Download confirmation resolved");
        confirmed
    }
}
