//! # Gigasheet API client
//!
//! A blocking client for the [Gigasheet](https://gigasheet.com) REST API.
//!
//! ## Features
//!
//! - **Imports**: from a world-readable URL (e.g. a presigned storage link) or
//!   inline file contents, optionally appending to an existing sheet
//! - **Sharing**: read or read/write access for one or more collaborators
//! - **Exports**: generate an export and obtain its presigned download link
//! - **Sheet operations**: metadata, rename, description, columns, row
//!   queries, saved filters, deduplication and enrichments
//! - **Diagnostics**: [`Client::check_setup`] validates key and connectivity
//!
//! ## Credentials
//!
//! The API key is passed explicitly through [`ClientConfig`], or read from
//! the `GIGASHEET_API_KEY` environment variable by [`ClientConfig::from_env`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use gigasheet::{Client, ClientConfig, ExportOptions};
//!
//! fn main() -> gigasheet::Result<()> {
//!     let client = Client::new(ClientConfig::from_env())?;
//!
//!     if !client.check_setup().is_ready() {
//!         eprintln!("check your API key");
//!         return Ok(());
//!     }
//!
//!     let export = client.export("d0966d5f_b668_44c5_8536_ae1f89ca8d37", &ExportOptions::default())?;
//!     println!("{}", export.url);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod links;
pub mod query;
pub mod types;
pub mod wait;

// Re-export main types
pub use client::Client;
pub use config::{ClientConfig, API_KEY_ENV, DEFAULT_API_BASE_URL, DEFAULT_UI_BASE_URL};
pub use error::{Error, Result};
pub use links::{handle_from_url, sheet_url};
pub use query::{resolve_column_ids, validate_filter_model};
pub use types::*;
pub use wait::WaitOptions;

/// Version of the client library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
