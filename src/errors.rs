//! Error values
//!
//! Every failure that flows through the engine, whether raised by a
//! computation, reported by a thunk, or produced by the engine itself, is an
//! [`ErrorInfo`]: a machine-readable code plus a human-readable message.

use serde::{Deserialize, Serialize};

/* ===================== Error Codes ===================== */

/// A yielded value was not something the engine knows how to wait on
pub const NOT_YIELDABLE: &str = "NotYieldable";

/// A thunk was started a second time
pub const THUNK_REUSED: &str = "ThunkReused";

/// A computation was resumed or raised into after it returned
pub const RESUMED_AFTER_DONE: &str = "ResumedAfterDone";

/// A computation was resumed while another step of it was still running
pub const COMPUTATION_BUSY: &str = "ComputationBusy";

/// The completion of a drive was dropped without ever being invoked
pub const DRIVE_ABANDONED: &str = "DriveAbandoned";

/// A value holding a live handle cannot be converted to JSON
pub const NOT_SERIALIZABLE: &str = "NotSerializable";

/// A future bridged into a promise panicked or was cancelled
pub const FUTURE_FAILED: &str = "FutureFailed";

/* ===================== ErrorInfo ===================== */

/// Error value with code and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}
