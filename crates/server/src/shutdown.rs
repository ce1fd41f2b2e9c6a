//! Graceful shutdown handling.

use tokio::signal;

/// Wait for a shutdown signal (Ctrl-C or SIGTERM).
///
/// Blocks until a signal is received. On Unix, SIGTERM is handled as well so
/// container runtimes can stop the server cleanly.
#[allow(clippy::expect_used)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        // If signal handlers cannot be installed there is no way to stop the
        // server cleanly, so failing loudly at startup is the right outcome.
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }
}
