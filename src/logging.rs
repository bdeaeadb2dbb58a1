//! Diagnostic logging capability injected into the workflow client.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{error, info};

/// Sink for diagnostic messages emitted by the client.
///
/// Logging is best-effort: implementations may fail (panic), and the client
/// swallows those failures so they never affect a call's result.
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Forwards messages to the `log` crate macros.
pub struct CrateLogger;

impl Logger for CrateLogger {
    fn info(&self, msg: &str) {
        info!("{}", msg);
    }

    fn error(&self, msg: &str) {
        error!("{}", msg);
    }
}

/// Discards all messages.
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _msg: &str) {}

    fn error(&self, _msg: &str) {}
}

/// Invokes the sink's `info`, downgrading a panicking sink to a no-op.
pub fn log_info(logger: &Arc<dyn Logger>, msg: &str) {
    let _ = catch_unwind(AssertUnwindSafe(|| logger.info(msg)));
}

/// Invokes the sink's `error`, downgrading a panicking sink to a no-op.
pub fn log_error(logger: &Arc<dyn Logger>, msg: &str) {
    let _ = catch_unwind(AssertUnwindSafe(|| logger.error(msg)));
}
