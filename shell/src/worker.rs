//! Runs blocking API calls off the prompt task.

use anyhow::Context;

/// Run `job` on tokio's blocking pool and wait for its result.
pub async fn offload<F, R>(job: F) -> anyhow::Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .context("background call did not finish")
}
