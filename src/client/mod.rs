//! Provider API interaction module
//!
//! This module provides the plumbing between the adapter and a region-scoped
//! REST API: the transport seam, an HTTP implementation of it, and the
//! [`Region`] scope every resource handle points back to.
//!
//! # Module Structure
//!
//! - [`transport`] - The `Transport` trait and request helpers
//! - [`http`] - reqwest-backed transport
//! - [`region`] - Region scope: request helpers, jobs, catalogs
//!
//! # Example
//!
//! ```ignore
//! use regioncloud::client::{HttpTransport, Region};
//! use std::sync::Arc;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let transport = HttpTransport::new("https://{service}.{region}.cloud.example.com/v3", "eu-1")?;
//!     let region = Region::new("eu-1", "my-project", Arc::new(transport));
//!     let databases = region.adapter("db-instance")?.list("").await?;
//!     Ok(())
//! }
//! ```

pub mod http;
pub mod region;
pub mod transport;

pub use http::HttpTransport;
pub use region::{Region, RegionOptions, DEFAULT_PAGE_SIZE};
pub use transport::{Method, Transport};
