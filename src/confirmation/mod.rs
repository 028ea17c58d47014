//! Signature confirmation polling
//!
//! One poll per attempt, a fixed number of attempts. Each attempt queries the
//! signature status with history search on and waits:
//! - `no_result_wait` (1.5 s) after a failed RPC call
//! - `settle` (0.5 s) after a successful round-trip, before classifying
//! - `retry` (0.5 s) before the next attempt when still below target
//!
//! Every wait and RPC call races the caller's [`CancelSignal`].

pub mod status;

pub use status::{PollMachine, PollState, PollStep};

use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::ConfirmationConfig;
use crate::events::{EventBus, LogLevel};
use crate::metrics::{metrics, InFlightGuard, Timer};
use crate::rpc_manager::ChainRpc;
use crate::types::ConfirmationLevel;

/// Terminal result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    pub state: PollState,
    pub attempts: u32,
}

impl ConfirmationOutcome {
    pub fn is_success(&self) -> bool {
        self.state.level().is_some()
    }
}

pub struct ConfirmationPoller {
    rpc: Arc<dyn ChainRpc>,
    events: EventBus,
    config: ConfirmationConfig,
}

impl ConfirmationPoller {
    pub fn new(rpc: Arc<dyn ChainRpc>, events: EventBus, config: ConfirmationConfig) -> Self {
        Self { rpc, events, config }
    }

    pub fn default_target(&self) -> ConfirmationLevel {
        self.config.target
    }

    /// Poll until `signature` reaches `target`, fails, times out or is cancelled
    pub async fn wait_for(
        &self,
        signature: &str,
        target: ConfirmationLevel,
        cancel: &CancelSignal,
    ) -> ConfirmationOutcome {
        let _in_flight = InFlightGuard::enter();
        let timer = Timer::new();
        let mut machine = PollMachine::new(target, self.config.max_attempts);

        let parsed = match parse_signature(signature) {
            Some(parsed) => parsed,
            None => {
                machine.reject();
                self.events.log("Signature was empty", LogLevel::Warning);
                return self.finish(&machine);
            }
        };

        while let Some(attempt) = machine.begin_attempt() {
            let response = match cancel.run(self.rpc.signature_status(&parsed)).await {
                Some(response) => response,
                None => return self.cancelled(&mut machine),
            };

            let report = match response {
                Ok(report) => report,
                Err(e) => {
                    debug!(signature, attempt, error = %e, "Signature status request failed");
                    self.events.log(
                        format!("There is no transaction for Signature: {}.", signature),
                        LogLevel::Info,
                    );
                    if !cancel.sleep(self.config.no_result_wait()).await {
                        return self.cancelled(&mut machine);
                    }
                    continue;
                }
            };

            if !cancel.sleep(self.config.settle()).await {
                return self.cancelled(&mut machine);
            }

            match machine.observe(report.as_ref()) {
                PollStep::Reached(level) => {
                    info!(signature, attempt, %level, "Transaction {}", level);
                    self.progress(format!("Transaction {}", level));
                    metrics().confirmations_succeeded.inc();
                    timer.observe_duration(&metrics().confirmation_latency);
                    self.events.value_changed();
                    return self.finish(&machine);
                }
                PollStep::Failed(err) => {
                    warn!(signature, attempt, error = %err, "Transaction failed on chain");
                    self.events
                        .log(format!("Transaction failed: {}", err), LogLevel::Error);
                    metrics().confirmations_failed.inc();
                    return self.finish(&machine);
                }
                PollStep::NoStatus => {
                    self.progress(format!("Waiting for signature. Try: {}", attempt));
                }
                PollStep::Below(report) => {
                    self.progress(format!(
                        "Signature result {}/31 status: {} target: {}",
                        report
                            .confirmations
                            .map(|c| c.to_string())
                            .unwrap_or_default(),
                        report.level,
                        target
                    ));
                }
            }

            if !cancel.sleep(self.config.retry()).await {
                return self.cancelled(&mut machine);
            }
        }

        machine.time_out();
        metrics().confirmations_timed_out.inc();
        self.events.log(
            format!(
                "Tried {} times. The transaction probably failed :( ",
                machine.attempts()
            ),
            LogLevel::Warning,
        );
        self.finish(&machine)
    }

    /// Poll and report the result to `on_done` exactly once
    pub async fn check_signature_status<F>(
        &self,
        signature: &str,
        target: ConfirmationLevel,
        cancel: &CancelSignal,
        on_done: F,
    ) -> ConfirmationOutcome
    where
        F: FnOnce(bool) + Send,
    {
        let outcome = self.wait_for(signature, target, cancel).await;
        on_done(outcome.is_success());
        outcome
    }

    /// Run [`check_signature_status`](Self::check_signature_status) on its own task
    pub fn spawn_check<F>(
        self: Arc<Self>,
        signature: String,
        target: ConfirmationLevel,
        cancel: CancelSignal,
        on_done: F,
    ) -> JoinHandle<ConfirmationOutcome>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        tokio::spawn(async move {
            self.check_signature_status(&signature, target, &cancel, on_done)
                .await
        })
    }

    /// Per-attempt diagnostics; always traced, shown only when enabled
    fn progress(&self, message: String) {
        if self.config.show_progress_messages {
            self.events.log(message, LogLevel::Info);
        } else {
            debug!("{}", message);
        }
    }

    fn cancelled(&self, machine: &mut PollMachine) -> ConfirmationOutcome {
        machine.cancel();
        metrics().confirmations_failed.inc();
        debug!(attempts = machine.attempts(), "Confirmation poll cancelled");
        self.finish(machine)
    }

    fn finish(&self, machine: &PollMachine) -> ConfirmationOutcome {
        ConfirmationOutcome {
            state: machine.state().clone(),
            attempts: machine.attempts(),
        }
    }
}

/// `None` for empty or unparsable signatures
fn parse_signature(signature: &str) -> Option<Signature> {
    let trimmed = signature.trim();
    if trimmed.is_empty() {
        return None;
    }
    Signature::from_str(trimmed).ok()
}
