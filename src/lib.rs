//! Read, overwrite and append cell ranges in Google Sheets.
//!
//! ```no_run
//! use ohsheet::sheets::{AccessConfig, RangeOperations, SPREADSHEETS_SCOPE, Session};
//!
//! # async fn run() -> ohsheet::Result<()> {
//! let access = AccessConfig::new("token.json", "credentials.json", [SPREADSHEETS_SCOPE]);
//! let session = Session::connect(&access).await?;
//!
//! let values = session.read("spreadsheet-id", "Sheet1!A1:C3").await?;
//! session
//!     .append_row("spreadsheet-id", "Sheet1!A1:C1", vec!["a".into(), "b".into()])
//!     .await?;
//! # let _ = values;
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod cancel;
pub mod error;
pub mod sheets;

pub use error::{AppError, Result};
