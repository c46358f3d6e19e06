//! Simulate command - run the download dialogue in the terminal.
//!
//! Stdin plays the user, stdout shows the bot, and a simulated engine stands
//! in for the modem. Ctrl+C cancels the dialogue or the running download.

use std::sync::Arc;
use std::time::Duration;

use esimbot::config::DownloadConfig;
use esimbot::device::{DeviceId, DeviceLocks};
use esimbot::download::{Dispatch, DownloadFlow, DownloadOrchestrator, DownloadOutcome};
use esimbot::error::FlowResult;
use esimbot::transport::{ChatId, InboundMessage, MessageHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::console::ConsoleTransport;
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::simulated::{SimulatedFactory, SimulatedModem, SimulationOptions};

/// The terminal is a single conversation.
const CONSOLE_CHAT: ChatId = ChatId(1);

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub require_code: bool,
    pub fail_at: Option<u8>,
    pub timeout_secs: Option<u64>,
    pub step_ms: u64,
}

type Flow = DownloadFlow<ConsoleTransport, SimulatedFactory>;

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("simulate");

    let mut config = DownloadConfig::from_config_file(runner.config());
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let options = SimulationOptions {
        require_code: args.require_code,
        fail_at: args.fail_at,
        step_delay: Duration::from_millis(args.step_ms),
    };

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received interrupt, cancelling...");
        shutdown_clone.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    println!("esimbot simulator v{}", esimbot::VERSION);
    println!("==========================");
    println!();
    println!("Device:  {}", config.device);
    println!("Timeout: {}s", config.timeout.as_secs());
    println!();
    println!("Type your replies and press Enter. Press Ctrl+C to cancel.");
    println!();

    let transport = Arc::new(ConsoleTransport::new());
    let locks = Arc::new(DeviceLocks::from_fn(|device: &DeviceId| {
        SimulatedModem::open(device)
    }));
    let orchestrator = DownloadOrchestrator::new(
        transport,
        Arc::new(SimulatedFactory::new(options)),
        locks,
        config,
    );
    let flow = DownloadFlow::new(orchestrator);

    let result = runtime.block_on(converse(&flow, &shutdown));
    // Stdin reads park a blocking thread that would otherwise hold up exit.
    runtime.shutdown_background();

    let snapshot = flow.orchestrator().metrics().snapshot();
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| CliError::Config(format!("Failed to serialize telemetry: {}", e)))?
    );

    result
}

/// Read console lines until a download finishes or the user gives up.
async fn converse(flow: &Flow, shutdown: &CancellationToken) -> Result<(), CliError> {
    flow.begin(CONSOLE_CHAT).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: i64 = 1;

    // Collect input until the dialogue starts a download.
    let mut download = loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            println!("Input closed before a download started.");
            return Ok(());
        };
        if let Dispatch::DownloadStarted(handle) =
            dispatch_line(flow, &line, &mut next_id).await?
        {
            break handle;
        }
    };

    // Keep routing input into the running download.
    let mut stdin_open = true;
    let joined = loop {
        tokio::select! {
            joined = &mut download => break Some(joined),
            _ = shutdown.cancelled() => break None,
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    dispatch_line(flow, &line, &mut next_id).await?;
                }
                None => stdin_open = false,
            },
        }
    };

    let Some(joined) = joined else {
        download.abort();
        let _ = download.await;
        println!("Download aborted.");
        return Ok(());
    };
    report(joined.map_err(|e| CliError::Config(format!("download task failed: {}", e)))?)
}

async fn dispatch_line(
    flow: &Flow,
    line: &str,
    next_id: &mut i64,
) -> Result<Dispatch, CliError> {
    if let Some(data) = flow.orchestrator().transport().button_for(line) {
        return Ok(flow.handle_button(CONSOLE_CHAT, &data).await?);
    }

    let message = InboundMessage::new(MessageHandle::new(CONSOLE_CHAT, *next_id), line);
    *next_id += 1;
    let dispatch = flow.handle_text(&message).await?;
    if !dispatch.is_handled() {
        println!("(nothing is waiting for input right now)");
    }
    Ok(dispatch)
}

fn report(result: FlowResult<DownloadOutcome>) -> Result<(), CliError> {
    match result {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Simulated download finished");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
