//! Shutdown signals: Ctrl-C everywhere, plus SIGTERM on unix

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `cancel` on the first shutdown signal.
///
/// Handlers are installed before this returns, so a signal sent right
/// after the call is already caught.
pub fn listen(cancel: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        tokio::select! {
            result = tokio::signal::ctrl_c() => log_ctrl_c(result),
            _ = terminate.recv() => info!("SIGTERM received, finishing current cycle"),
        }

        #[cfg(not(unix))]
        log_ctrl_c(tokio::signal::ctrl_c().await);

        cancel.cancel();
    }))
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Shutdown requested, finishing current cycle"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
