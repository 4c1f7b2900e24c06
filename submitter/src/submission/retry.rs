use std::path::Path;

use miette::{miette, Result};

use crate::console::OperatorConsole;


/// Progress of creating a job for one input file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreationAttemptState {
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl CreationAttemptState {
    pub fn record_failure<S: Into<String>>(&mut self, reason: S) {
        self.attempts += 1;
        self.last_error = Some(reason.into());
    }

    pub fn last_error_or_unknown(&self) -> &str {
        self.last_error.as_deref().unwrap_or("unknown error")
    }
}


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Creation attempts per file, the first one included.
    pub max_attempts: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Remediation {
    ResetProject,
    Abandon,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    ResetAndRetry,
    GiveUp,
}


/// Chooses what happens after a failed creation attempt.
///
/// Once the attempt budget is spent the file is given up without consulting `remediate`.
pub fn decide_retry<F>(
    state: &CreationAttemptState,
    policy: &RetryPolicy,
    remediate: F,
) -> Result<RetryDecision>
where
    F: FnOnce(&CreationAttemptState) -> Result<Remediation>,
{
    if state.attempts >= policy.max_attempts {
        return Ok(RetryDecision::GiveUp);
    }

    Ok(match remediate(state)? {
        Remediation::ResetProject => RetryDecision::ResetAndRetry,
        Remediation::Abandon => RetryDecision::GiveUp,
    })
}


/// Counts input files in a row that ended without a job.
#[derive(Clone, Debug)]
pub struct FailedFileCounter {
    consecutive_failures: u32,
    limit: u32,
}

impl FailedFileCounter {
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive_failures: 0,
            limit,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Returns `true` once the limit is reached and the batch should stop.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures >= self.limit
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}


/// Picks a [`Remediation`] after a failed job creation.
pub trait RemediationStrategy {
    fn choose(&mut self, file: &Path, state: &CreationAttemptState) -> Result<Remediation>;
}

impl<F> RemediationStrategy for F
where
    F: FnMut(&Path, &CreationAttemptState) -> Remediation,
{
    fn choose(&mut self, file: &Path, state: &CreationAttemptState) -> Result<Remediation> {
        Ok(self(file, state))
    }
}


pub const REMEDIATION_PROMPT: &str =
    "Type 'reset' to reset the project and retry, anything else to skip this file: ";

/// Asks the operator whether to reset the project or skip the file.
///
/// Only consulted while attempts remain: the failure that spends the last attempt abandons
/// the file without a prompt.
pub struct ConsoleRemediation<'c> {
    console: &'c mut dyn OperatorConsole,
}

impl<'c> ConsoleRemediation<'c> {
    pub fn new(console: &'c mut dyn OperatorConsole) -> Self {
        Self { console }
    }
}

impl RemediationStrategy for ConsoleRemediation<'_> {
    fn choose(&mut self, file: &Path, state: &CreationAttemptState) -> Result<Remediation> {
        self.console.show(&format!(
            "Creating a render job for {} failed (attempt {}): {}",
            file.display(),
            state.attempts,
            state.last_error_or_unknown()
        ));

        let answer = self
            .console
            .prompt(REMEDIATION_PROMPT)
            .map_err(|error| miette!("Could not ask for remediation: {error}"))?;

        Ok(parse_remediation(&answer))
    }
}

fn parse_remediation(answer: &str) -> Remediation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "reset" | "r" => Remediation::ResetProject,
        _ => Remediation::Abandon,
    }
}
