//! Process exit codes.
//!
//! Library errors carry their own code; anything else is a configuration
//! problem.

use trr_client::ApiError;
use trr_core::ReporterError;

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1;

/// Code of the first library error in the cause chain.
pub fn from_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ReporterError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ApiError>() {
            return e.exit_code();
        }
    }
    CONFIG_ERROR
}
