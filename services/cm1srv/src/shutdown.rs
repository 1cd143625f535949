//! Shutdown signals
//!
//! Ctrl+C, and SIGTERM on Unix, cancel the polling token. The controller
//! stops at its next cancellation point.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` on the first shutdown signal
///
/// Abort the returned handle to stop listening once polling has ended on
/// its own.
pub fn cancel_on_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!("{} received, stopping after the current request", signal);
        token.cancel();
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            _ = tokio::signal::ctrl_c() => "Ctrl+C",
            _ = term.recv() => "SIGTERM",
        },
        Err(e) => {
            warn!("No SIGTERM handler ({}), only Ctrl+C stops polling", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl+C handler failed: {}", e);
            }
            "Ctrl+C"
        },
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler failed: {}", e);
    }
    "Ctrl+C"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_untouched_until_signal() {
        let token = CancellationToken::new();
        let listener = cancel_on_shutdown(token.clone());
        tokio::task::yield_now().await;

        assert!(!token.is_cancelled());
        listener.abort();
        assert!(listener.await.unwrap_err().is_cancelled());
        assert!(!token.is_cancelled());
    }
}
