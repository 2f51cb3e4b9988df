//! Interrupt handling

/// Resolve when the process receives SIGINT or SIGTERM
///
/// Returns the name of the signal. If the handlers cannot be installed the
/// future never resolves, so the run simply proceeds uninterruptible.
#[cfg(unix)]
pub async fn signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Failed to install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
            "SIGTERM"
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down");
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
pub async fn signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C, shutting down");
            "Ctrl+C"
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending().await
        }
    }
}
