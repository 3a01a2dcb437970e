use std::fmt::Display;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, bounded};
use tracing::warn;

use crate::config::SearchConfig;

/// Timeout and retry rules applied to one collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Per-attempt timeout, `None` to wait indefinitely
    pub timeout: Option<Duration>,

    /// End of the run's time budget, if it has one
    pub deadline: Option<Instant>,

    /// Retries after the first failed attempt
    pub max_retries: u32,
}

impl CallPolicy {
    pub fn from_config(config: &SearchConfig, deadline: Option<Instant>) -> Self {
        Self {
            timeout: config.call_timeout,
            deadline,
            max_retries: config.max_retries,
        }
    }

    /// Timeout for an attempt starting now
    ///
    /// The per-call timeout is capped by whatever is left of the deadline, so
    /// no attempt can outlive the time budget. Fails with
    /// [`CallFailure::Interrupted`] once the deadline has passed.
    pub fn attempt_timeout(&self) -> Result<Option<Duration>, CallFailure> {
        let Some(deadline) = self.deadline else {
            return Ok(self.timeout);
        };

        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(CallFailure::Interrupted);
        }
        Ok(Some(self.timeout.map_or(left, |call| call.min(left))))
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Why a guarded call produced no value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// No answer within the timeout
    TimedOut(Duration),

    /// The call thread could not be started or died before answering
    Lost(String),

    /// The run's deadline passed before an answer arrived
    Interrupted,
}

/// Run `call`, giving up after `timeout`
///
/// Without a timeout the call runs inline. With one it runs on its own
/// thread and the caller waits on a bounded channel; a result that arrives
/// after the deadline is dropped.
pub fn call_with_deadline<T, F>(timeout: Option<Duration>, call: F) -> Result<T, CallFailure>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(timeout) = timeout else {
        return Ok(call());
    };

    let (tx, rx) = bounded::<T>(1);
    thread::Builder::new()
        .name("search-call".into())
        .spawn(move || {
            // Receiver is gone when the caller already timed out
            let _ = tx.send(call());
        })
        .map_err(|e| CallFailure::Lost(format!("failed to spawn call thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => Err(CallFailure::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(CallFailure::Lost("call thread exited without a result".into()))
        }
    }
}

/// Retry `attempt` until it succeeds or `policy.max_retries` retries are spent
///
/// Each attempt gets the timeout [`CallPolicy::attempt_timeout`] computes
/// when it starts. Once the deadline has passed no further attempt is made
/// and the outcome is [`CallFailure::Interrupted`], whatever the last error
/// was. Returns the final outcome together with the number of retries used.
pub fn with_retries<T, E, F>(policy: CallPolicy, what: &str, mut attempt: F) -> (Result<T, E>, u32)
where
    E: Display + From<CallFailure>,
    F: FnMut(Option<Duration>) -> Result<T, E>,
{
    let mut retries = 0;
    loop {
        let timeout = match policy.attempt_timeout() {
            Ok(timeout) => timeout,
            Err(failure) => return (Err(failure.into()), retries),
        };

        match attempt(timeout) {
            Ok(value) => return (Ok(value), retries),
            Err(_) if policy.expired() => return (Err(CallFailure::Interrupted.into()), retries),
            Err(err) if retries < policy.max_retries => {
                retries += 1;
                warn!(
                    call = what,
                    retry = retries,
                    max_retries = policy.max_retries,
                    error = %err,
                    "retrying failed call"
                );
            }
            Err(err) => return (Err(err), retries),
        }
    }
}

/// Apply `work` to every job on at most `workers` threads
///
/// Results come back in job order. With a single worker (or a single job)
/// everything runs inline on the calling thread.
pub fn fan_out<J, R, F>(jobs: Vec<J>, workers: usize, work: F) -> Vec<R>
where
    J: Send,
    R: Send,
    F: Fn(J) -> R + Sync,
{
    let total = jobs.len();
    if workers <= 1 || total <= 1 {
        return jobs.into_iter().map(work).collect();
    }

    let (job_tx, job_rx) = bounded::<(usize, J)>(total);
    let (result_tx, result_rx) = bounded::<(usize, R)>(total);

    for job in jobs.into_iter().enumerate() {
        // Capacity covers every job and the receiver is still held here
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers.min(total) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let work = &work;
            scope.spawn(move || {
                while let Ok((index, job)) = job_rx.recv() {
                    let _ = result_tx.send((index, work(job)));
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, R)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
