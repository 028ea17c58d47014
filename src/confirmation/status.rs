//! Poll state machine, free of I/O and timers
//!
//! The poller feeds it one status report per attempt and acts on the step it
//! returns. Keeping the transitions here lets tests drive every path without
//! a runtime.

use serde::Serialize;

use crate::types::{ConfirmationLevel, SignatureStatusReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PollState {
    /// Signature accepted, no status seen yet
    Pending,
    Processed,
    Confirmed,
    Finalized,
    /// Attempt budget spent below target
    TimedOut,
    /// Empty or unparsable signature; never polled
    Rejected,
    /// Status carried an on-chain error
    Failed(String),
    Cancelled,
}

impl PollState {
    fn at(level: ConfirmationLevel) -> Self {
        match level {
            ConfirmationLevel::Processed => PollState::Processed,
            ConfirmationLevel::Confirmed => PollState::Confirmed,
            ConfirmationLevel::Finalized => PollState::Finalized,
        }
    }

    pub fn level(&self) -> Option<ConfirmationLevel> {
        match self {
            PollState::Processed => Some(ConfirmationLevel::Processed),
            PollState::Confirmed => Some(ConfirmationLevel::Confirmed),
            PollState::Finalized => Some(ConfirmationLevel::Finalized),
            _ => None,
        }
    }
}

/// What one observed status means for the poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// Target reached; poll is over
    Reached(ConfirmationLevel),
    /// On-chain error; poll is over
    Failed(String),
    /// Node knows nothing about the signature yet
    NoStatus,
    /// Seen, but below target
    Below(SignatureStatusReport),
}

#[derive(Debug, Clone)]
pub struct PollMachine {
    target: ConfirmationLevel,
    max_attempts: u32,
    attempts: u32,
    state: PollState,
    finished: bool,
}

impl PollMachine {
    pub fn new(target: ConfirmationLevel, max_attempts: u32) -> Self {
        Self {
            target,
            max_attempts,
            attempts: 0,
            state: PollState::Pending,
            finished: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start the next attempt; `None` once the budget is spent or the poll ended
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.finished || self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    /// Classify the status returned by the current attempt
    pub fn observe(&mut self, report: Option<&SignatureStatusReport>) -> PollStep {
        let Some(report) = report else {
            return PollStep::NoStatus;
        };

        if let Some(err) = &report.err {
            self.finish(PollState::Failed(err.clone()));
            return PollStep::Failed(err.clone());
        }

        self.state = PollState::at(report.level);
        if report.level.satisfies(self.target) {
            self.finished = true;
            PollStep::Reached(report.level)
        } else {
            PollStep::Below(report.clone())
        }
    }

    /// Budget exhausted without reaching target
    pub fn time_out(&mut self) {
        self.finish(PollState::TimedOut);
    }

    pub fn cancel(&mut self) {
        self.finish(PollState::Cancelled);
    }

    pub fn reject(&mut self) {
        self.finish(PollState::Rejected);
    }

    fn finish(&mut self, state: PollState) {
        self.state = state;
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalized_satisfies_confirmed_on_first_attempt() {
        let mut machine = PollMachine::new(ConfirmationLevel::Confirmed, 30);
        assert_eq!(machine.begin_attempt(), Some(1));

        let report = SignatureStatusReport::at_level(ConfirmationLevel::Finalized);
        assert_eq!(
            machine.observe(Some(&report)),
            PollStep::Reached(ConfirmationLevel::Finalized)
        );
        assert_eq!(machine.state(), &PollState::Finalized);
        assert!(machine.is_finished());
        assert_eq!(machine.begin_attempt(), None);
    }

    #[test]
    fn test_below_target_keeps_polling() {
        let mut machine = PollMachine::new(ConfirmationLevel::Finalized, 30);
        machine.begin_attempt();
        let report = SignatureStatusReport::at_level(ConfirmationLevel::Confirmed);

        assert!(matches!(machine.observe(Some(&report)), PollStep::Below(_)));
        assert_eq!(machine.state(), &PollState::Confirmed);
        assert!(!machine.is_finished());
    }

    #[test]
    fn test_budget_is_exact() {
        let mut machine = PollMachine::new(ConfirmationLevel::Confirmed, 30);
        let mut attempts = 0;
        while machine.begin_attempt().is_some() {
            assert_eq!(machine.observe(None), PollStep::NoStatus);
            attempts += 1;
        }
        assert_eq!(attempts, 30);

        machine.time_out();
        assert_eq!(machine.state(), &PollState::TimedOut);
        assert_eq!(machine.state().level(), None);
    }

    #[test]
    fn test_on_chain_error_terminates() {
        let mut machine = PollMachine::new(ConfirmationLevel::Confirmed, 30);
        machine.begin_attempt();
        let report = SignatureStatusReport {
            err: Some("InstructionError(0, Custom(1))".to_string()),
            ..SignatureStatusReport::at_level(ConfirmationLevel::Processed)
        };

        assert!(matches!(machine.observe(Some(&report)), PollStep::Failed(_)));
        assert!(machine.is_finished());
        assert_eq!(machine.begin_attempt(), None);
    }
}
