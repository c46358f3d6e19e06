//! Simulated download engine for trying the flow without hardware.
//!
//! Walks through the progress steps with a delay between them, asks for a
//! confirmation code when configured to, and always asks the user to confirm
//! the profile before "installing" it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use esimbot::activation::ActivationCode;
use esimbot::device::{DeviceError, DeviceId};
use esimbot::engine::{
    DownloadEngine, DownloadHooks, DownloadProgress, EngineError, EngineFactory, ProfileMetadata,
    MAX_PROGRESS_STEP,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Step at which a confirmation code is requested.
const CONFIRMATION_CODE_STEP: u8 = 3;
/// Step at which the profile metadata is shown.
const CONFIRM_DOWNLOAD_STEP: u8 = 5;
/// Step at which the bound profile is loaded onto the eUICC.
const LOAD_PROFILE_STEP: u8 = 8;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Behaviour of the simulated engine.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Ask for a confirmation code mid-download unless one was supplied.
    pub require_code: bool,
    /// Fail when this step is reached.
    pub fail_at: Option<u8>,
    /// Delay between steps.
    pub step_delay: Duration,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            require_code: false,
            fail_at: None,
            step_delay: Duration::from_millis(300),
        }
    }
}

/// Pretend modem connection.
#[derive(Debug)]
pub struct SimulatedModem {
    device: DeviceId,
    opened_at: Instant,
}

impl SimulatedModem {
    pub fn open(device: &DeviceId) -> Result<Self, DeviceError> {
        info!(device = %device, "Opening simulated modem");
        Ok(Self {
            device: device.clone(),
            opened_at: Instant::now(),
        })
    }
}

pub struct SimulatedFactory {
    options: SimulationOptions,
}

impl SimulatedFactory {
    pub fn new(options: SimulationOptions) -> Self {
        Self { options }
    }
}

impl EngineFactory for SimulatedFactory {
    type Connection = SimulatedModem;
    type Engine = SimulatedEngine;

    fn open(&self, modem: Arc<SimulatedModem>) -> Result<SimulatedEngine, EngineError> {
        debug!(
            device = %modem.device,
            modem_age_ms = modem.opened_at.elapsed().as_millis() as u64,
            "Opening simulated engine"
        );
        Ok(SimulatedEngine {
            modem,
            options: self.options.clone(),
        })
    }
}

pub struct SimulatedEngine {
    modem: Arc<SimulatedModem>,
    options: SimulationOptions,
}

impl SimulatedEngine {
    /// Sleep for the step delay, waking early on cancellation.
    fn pause(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        let deadline = Instant::now() + self.options.step_delay;
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn metadata(code: &ActivationCode) -> ProfileMetadata {
        ProfileMetadata::new(
            "Simulated Carrier",
            format!("Profile {}", code.matching_id()),
            "8900000000000000000F",
        )
    }
}

impl DownloadEngine for SimulatedEngine {
    fn download(
        &mut self,
        cancel: &CancellationToken,
        code: &ActivationCode,
        hooks: &dyn DownloadHooks,
    ) -> Result<(), EngineError> {
        info!(
            device = %self.modem.device,
            smdp = code.smdp_address(),
            "Simulated download started"
        );

        for step in 0..=MAX_PROGRESS_STEP {
            if self.options.fail_at == Some(step) {
                return Err(EngineError::Failed(format!(
                    "simulated failure at step {}",
                    step
                )));
            }

            match step {
                CONFIRMATION_CODE_STEP
                    if self.options.require_code && code.confirmation_code().is_none() =>
                {
                    hooks.progress(DownloadProgress::ConfirmationCodeRequired);
                    let confirmation = hooks.confirmation_code();
                    if cancel.is_cancelled() {
                        return Err(EngineError::Interrupted);
                    }
                    if confirmation.is_empty() {
                        return Err(EngineError::Failed(
                            "confirmation code required".to_string(),
                        ));
                    }
                    debug!(length = confirmation.len(), "Got confirmation code");
                }
                CONFIRM_DOWNLOAD_STEP => {
                    hooks.progress(DownloadProgress::ConfirmDownload);
                    if !hooks.confirm_download(&Self::metadata(code)) {
                        if cancel.is_cancelled() {
                            return Err(EngineError::Interrupted);
                        }
                        return Err(EngineError::Canceled);
                    }
                }
                LOAD_PROFILE_STEP => hooks.progress(DownloadProgress::LoadBoundProfile),
                _ => {}
            }

            hooks.progress(DownloadProgress::Step(step));
            if step < MAX_PROGRESS_STEP {
                self.pause(cancel)?;
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        debug!(device = %self.modem.device, "Simulated engine closed");
    }
}
