//! TestRail API v2 client.
//!
//! Thin typed wrapper over the TestRail REST API: basic auth, transparent
//! pagination of bulk endpoints and a single retry on rate limiting.
//!
//! # Example
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use trr_client::{Filter, TestRailClient};
//!
//! # async fn example() -> Result<(), trr_client::ApiError> {
//! let client = TestRailClient::from_env()?;
//! let statuses = client.get_statuses().await?;
//! let failed: Vec<_> = client
//!     .get_tests(42, &Filter::new().ids("status_id", &[5]))
//!     .try_collect()
//!     .await?;
//! # let _ = (statuses, failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TESTRAIL_URL` | Service base URL | (required) |
//! | `TESTRAIL_USER` | Account name | - |
//! | `TESTRAIL_PASSWORD` | Password or API key | - |
//! | `TESTRAIL_TIMEOUT` | Request timeout in seconds | `60` |
//! | `TESTRAIL_RETRY_TIMEOUT` | Wait for a 429 without hint | `60` |

pub mod client;
pub mod error;
pub mod types;

pub use client::{Filter, Listing, TestRailClient};
pub use error::{ApiError, ApiResult};
pub use types::*;
