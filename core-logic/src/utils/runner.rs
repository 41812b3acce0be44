use crate::error::{CoreError, TaskError};
use crate::traits::AccountTask;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Batch scheduling knobs.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Accounts processed concurrently in one batch.
    pub batch_size: usize,
    /// Hard wall-clock ceiling for a single account.
    pub account_timeout: Duration,
    /// Pause between two batches of the same pass.
    pub batch_pause: Duration,
    /// Sleep after a full pass before starting the next one.
    pub pass_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            account_timeout: Duration::from_secs(24 * 60 * 60),
            batch_pause: Duration::from_secs(3),
            pass_interval: Duration::from_secs(1440 * 60),
        }
    }
}

/// How a single account ended within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome<R> {
    Completed(R),
    Skipped(String),
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Everything the coordinator learns from one pass over the account list.
#[derive(Debug)]
pub struct PassSummary<R> {
    /// `(account index, outcome)` in completion order.
    pub outcomes: Vec<(usize, AccountOutcome<R>)>,
    pub elapsed: Duration,
    /// Set when cancellation stopped the pass before every batch ran.
    pub interrupted: bool,
    /// `(account number, message)` of the account that stopped the pass.
    pub fatal: Option<(usize, String)>,
}

impl<R> PassSummary<R> {
    fn count(&self, pred: impl Fn(&AccountOutcome<R>) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Completed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Failed(_)))
    }

    pub fn timed_out(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::TimedOut))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Cancelled))
    }

    /// The fatal stop as an error, if one happened.
    pub fn fatal_error(&self) -> Option<CoreError> {
        self.fatal.as_ref().map(|(account, message)| CoreError::Fatal {
            account: *account,
            message: message.clone(),
        })
    }

    /// Reports of accounts that completed their sequence.
    pub fn reports(&self) -> impl Iterator<Item = (usize, &R)> {
        self.outcomes.iter().filter_map(|(i, o)| match o {
            AccountOutcome::Completed(r) => Some((*i, r)),
            _ => None,
        })
    }
}

enum Finished<R> {
    Outcome(AccountOutcome<R>),
    Fatal(String),
}

pub struct WorkerRunner;

impl WorkerRunner {
    /// Returns a token that is cancelled on Ctrl+C (and SIGTERM on unix).
    pub fn shutdown_token() -> CancellationToken {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("🛑 Received shutdown signal. Initiating graceful shutdown...");
            cloned_token.cancel();
        });

        token
    }

    /// Runs `tasks` in batches of `config.batch_size`, waiting for every
    /// account of a batch before starting the next.
    ///
    /// A task returning [`TaskError::Fatal`] cancels `cancel`, which aborts
    /// the rest of the batch; the summary still holds every outcome gathered
    /// so far and carries the fatal stop in `fatal`.
    pub async fn run_pass<T: AccountTask>(
        tasks: Vec<T>,
        config: &RunnerConfig,
        cancel: &CancellationToken,
    ) -> PassSummary<T::Report> {
        let start_time = Instant::now();
        let batch_size = config.batch_size.max(1);
        let total = tasks.len();

        let mut outcomes = Vec::with_capacity(total);
        let mut interrupted = false;
        let mut stopped: Option<(usize, String)> = None;
        let mut pending = tasks.into_iter().peekable();

        while pending.peek().is_some() {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let batch: Vec<T> = pending.by_ref().take(batch_size).collect();
            debug!("Starting batch of {} accounts", batch.len());

            let mut set = JoinSet::new();
            for task in batch {
                let index = task.index();
                let token = cancel.child_token();
                let timeout = config.account_timeout;
                let span = tracing::info_span!("account", account = index + 1);

                set.spawn(
                    async move {
                        let finished = tokio::select! {
                            _ = token.cancelled() => Finished::Outcome(AccountOutcome::Cancelled),
                            res = tokio::time::timeout(timeout, task.run(token.clone())) => match res {
                                Ok(Ok(report)) => Finished::Outcome(AccountOutcome::Completed(report)),
                                Ok(Err(TaskError::Skipped(reason))) => {
                                    Finished::Outcome(AccountOutcome::Skipped(reason))
                                }
                                Ok(Err(TaskError::Failed(reason))) => {
                                    Finished::Outcome(AccountOutcome::Failed(reason))
                                }
                                Ok(Err(TaskError::Fatal(reason))) => Finished::Fatal(reason),
                                Err(_) => Finished::Outcome(AccountOutcome::TimedOut),
                            },
                        };
                        (index, finished)
                    }
                    .instrument(span),
                );
            }

            let mut fatal: Option<(usize, String)> = None;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((index, Finished::Outcome(outcome))) => {
                        if matches!(outcome, AccountOutcome::TimedOut) {
                            error!(
                                "[Account {}] Timed out after {:?}, abandoning",
                                index + 1,
                                config.account_timeout
                            );
                        }
                        outcomes.push((index, outcome));
                    }
                    Ok((index, Finished::Fatal(message))) => {
                        if fatal.is_none() {
                            error!(
                                "[Account {}] Fatal: {}. Stopping all accounts.",
                                index + 1,
                                message
                            );
                            cancel.cancel();
                            fatal = Some((index, message));
                        }
                    }
                    Err(e) => {
                        error!("An account task panicked or failed to join: {:?}", e);
                    }
                }
            }

            if let Some((index, message)) = fatal {
                stopped = Some((index + 1, message));
                break;
            }

            if pending.peek().is_some() && !config.batch_pause.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(config.batch_pause) => {}
                }
            }
        }

        let summary = PassSummary {
            outcomes,
            elapsed: start_time.elapsed(),
            interrupted: interrupted || cancel.is_cancelled(),
            fatal: stopped,
        };

        let rate = if total > 0 {
            (summary.completed() as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "Total Time: {:.1}s | Completed: {} | Skipped: {} | Failed: {} | Timed out: {} | Success Rate: {:.2}%",
            summary.elapsed.as_secs_f64(),
            summary.completed(),
            summary.skipped(),
            summary.failed(),
            summary.timed_out(),
            rate
        );
        if summary.interrupted {
            warn!(
                "Pass interrupted: {} of {} accounts were not finished",
                total - summary.outcomes.len() + summary.cancelled(),
                total
            );
        }

        summary
    }

    /// Repeats passes until `cancel` fires, sleeping `config.pass_interval`
    /// between them. `make_tasks` builds fresh tasks for every pass and
    /// `on_pass` sees each summary before the sleep.
    pub async fn run_forever<T, F, S>(
        config: &RunnerConfig,
        cancel: &CancellationToken,
        mut make_tasks: F,
        mut on_pass: S,
    ) -> Result<(), CoreError>
    where
        T: AccountTask,
        F: FnMut() -> Vec<T>,
        S: FnMut(&PassSummary<T::Report>),
    {
        let mut pass: u64 = 0;
        loop {
            pass += 1;
            let tasks = make_tasks();
            info!("Pass {} starting with {} accounts", pass, tasks.len());

            let summary = Self::run_pass(tasks, config, cancel).await;
            on_pass(&summary);
            if let Some(err) = summary.fatal_error() {
                return Err(err);
            }

            if cancel.is_cancelled() {
                break;
            }

            info!(
                "=============Completed all accounts | Waiting {} minutes=============",
                config.pass_interval.as_secs() / 60
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(config.pass_interval) => {}
            }
        }

        info!("🛑 Shutdown Complete.");
        Ok(())
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = signal::ctrl_c() => {
                        if let Err(err) = res {
                            error!("Unable to listen for Ctrl+C: {}", err);
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {}", err);
                if signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
