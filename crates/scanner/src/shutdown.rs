//! Interrupt listening for drain-based shutdown.
//!
//! Shutdown is cooperative: the signal listener only records that an
//! interrupt arrived and announces it; no worker is ever aborted. The scan
//! supervisor consults [`ShutdownSignal::is_received`] after the worker
//! group has drained and prints the completion line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tracks whether an external termination signal (SIGINT/SIGTERM) arrived.
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    received: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Installs the signal listener and returns the shared flag.
    ///
    /// Must be called from within a tokio runtime. If the process cannot
    /// install signal handlers the listener degrades to never firing, which
    /// leaves the normal drain path intact.
    pub fn listen() -> Self {
        let signal = Self {
            received: Arc::new(AtomicBool::new(false)),
        };
        let flag = Arc::clone(&signal.received);
        tokio::spawn(async move {
            if wait_for_interrupt().await {
                println!("\nReceived interrupt signal. Waiting for ongoing tasks to finish...");
                flag.store(true, Ordering::SeqCst);
            }
        });
        signal
    }

    /// A signal source that never fires. Used by tests and embedded callers.
    pub fn disabled() -> Self {
        Self {
            received: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` once an interrupt has been received.
    pub fn is_received(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }
}

/// Blocks until SIGINT or SIGTERM arrives. Returns `false` only if no
/// handler could be installed.
#[cfg(unix)]
async fn wait_for_interrupt() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::warn!(%error, "failed to install SIGTERM handler; falling back to SIGINT only");
            return tokio::signal::ctrl_c().await.is_ok();
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "failed to listen for SIGINT");
                false
            }
        },
        _ = sigterm.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, "failed to listen for ctrl-c");
            false
        }
    }
}
