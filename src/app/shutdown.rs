//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

/// Cancels `cancel` on the first Ctrl-C.
///
/// The run stops fetching and committing, then writes what it has; a second
/// Ctrl-C terminates the process immediately.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::warn!("Failed to listen for Ctrl-C: {e}");
                    return;
                }
                log::warn!("Interrupted; finishing current work and writing reports (Ctrl-C again to abort)");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            }
        }
    })
}

/// Stops the Ctrl-C listener once the work is done.
pub async fn shutdown_gracefully(cancel: CancellationToken, listener: tokio::task::JoinHandle<()>) {
    if !cancel.is_cancelled() {
        cancel.cancel();
        let _ = listener.await;
    } else {
        // Still waiting for a second Ctrl-C
        listener.abort();
    }
}
