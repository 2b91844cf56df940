//! Failure reporting for the playback engine.
//!
//! Engine failures never cross `start`/`stop`; they go to a [`DiagnosticSink`].

use crate::Error;

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, error: &Error);
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, error: &Error) {
        tracing::error!(kind = ?error.kind(), "{}", error);
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn report(&self, error: &Error) {
        self(error)
    }
}
