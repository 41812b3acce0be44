use crate::error::TaskError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// One unit of per-account work scheduled by [`crate::WorkerRunner`].
///
/// Implementations own everything they need; nothing is shared between
/// tasks of the same batch.
#[async_trait]
pub trait AccountTask: Send + Sync + 'static {
    type Report: Send + 'static;

    /// Zero-based position of the account in the input list.
    fn index(&self) -> usize;

    /// Runs the account's sequence. `cancel` fires on shutdown or when
    /// another account reported a fatal error.
    async fn run(&self, cancel: CancellationToken) -> Result<Self::Report, TaskError>;
}
