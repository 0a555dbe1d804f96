//! Polling server-side jobs until they finish.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::{require_handle, Client};
use crate::error::{Error, Result};

/// Statuses of a job that is still running.
pub const PENDING_STATUSES: [&str; 3] = ["uploading", "loading", "processing"];

/// Status of a job that finished successfully.
pub const SUCCESS_STATUS: &str = "processed";

/// Options for [`Client::wait_for_file_to_finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Pause between two polls.
    pub poll_interval: Duration,

    /// Number of polls before giving up.
    pub max_tries: u32,

    /// Count deletion of the polled handle as success.
    ///
    /// Append jobs create a transient sheet that is deleted once the job is
    /// done; polling it then answers 400 with a body mentioning `deleted`.
    pub deletion_is_success: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_tries: 1000,
            deletion_is_success: false,
        }
    }
}

impl WaitOptions {
    /// Set the pause between polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the number of polls.
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Treat deletion of the handle as success.
    pub fn with_deletion_is_success(mut self, deletion_is_success: bool) -> Self {
        self.deletion_is_success = deletion_is_success;
        self
    }
}

/// What a single poll tells us about a job.
#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Done,
    Pending(Option<String>),
    Failed(String),
}

fn classify_status(status: Option<&str>) -> PollOutcome {
    match status {
        Some(SUCCESS_STATUS) => PollOutcome::Done,
        Some(s) if PENDING_STATUSES.contains(&s) => PollOutcome::Pending(Some(s.to_string())),
        Some(s) => PollOutcome::Failed(s.to_string()),
        None => PollOutcome::Failed("none".to_string()),
    }
}

fn is_deleted_response(err: &Error) -> bool {
    matches!(err, Error::Api { status: 400, message } if message.contains("deleted"))
}

impl Client {
    /// Poll `handle` until it is processed.
    ///
    /// Errors while polling are ignored and the poll is repeated, except a
    /// deletion response when [`WaitOptions::deletion_is_success`] is set.
    /// A status outside the pending set fails with [`Error::JobFailed`].
    pub fn wait_for_file_to_finish(&self, handle: &str, options: &WaitOptions) -> Result<()> {
        require_handle(handle)?;

        let mut last_status = None;
        let mut last_error = None;
        for attempt in 0..options.max_tries {
            if attempt != 0 {
                std::thread::sleep(options.poll_interval);
            }

            let info = match self.info(handle) {
                Ok(info) => info,
                Err(e) if options.deletion_is_success && is_deleted_response(&e) => {
                    info!(handle, "handle deleted after completion");
                    return Ok(());
                }
                Err(e) => {
                    warn!(handle, attempt, error = %e, "poll failed, retrying");
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            match classify_status(info.status.as_deref()) {
                PollOutcome::Done => {
                    info!(handle, polls = attempt + 1, "handle finished");
                    return Ok(());
                }
                PollOutcome::Pending(status) => {
                    debug!(handle, attempt, status = ?status, "still waiting");
                    last_status = status;
                }
                PollOutcome::Failed(status) => {
                    return Err(Error::JobFailed {
                        handle: handle.to_string(),
                        status,
                    });
                }
            }
        }

        Err(Error::WaitExhausted {
            handle: handle.to_string(),
            tries: options.max_tries,
            last_status,
            last_error,
        })
    }
}
