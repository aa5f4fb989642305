pub mod clear_cache;
pub mod run;
pub mod status;
pub mod watch;

use anyhow::{Context, Result};
use feedmirror_sync::CancelToken;

/// Run a blocking `job` while Ctrl-C trips `cancel` instead of killing the
/// process, so in-flight resources finish cleanly.
pub(crate) fn with_ctrl_c<T, F>(cancel: CancelToken, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c, finishing in-flight resources");
                cancel.cancel();
            }
        });
        tokio::task::spawn_blocking(job)
            .await
            .context("sync task panicked")
    })
}
