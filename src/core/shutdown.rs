//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process receives a termination
//! signal. [`WorkerManager::shutdown_on_signal`](crate::WorkerManager::shutdown_on_signal)
//! awaits it before draining the pool.
//!
//! - **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`
//! - **Elsewhere:** Ctrl-C via [`tokio::signal::ctrl_c`]

/// Waits for a termination signal. Fails only if signal registration fails.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for Ctrl-C. Fails only if signal registration fails.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
