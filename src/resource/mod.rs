//! Resource abstraction layer
//!
//! Resource kinds are data: definitions are loaded from JSON files at compile
//! time, and one generic [`Adapter`] runs every lifecycle operation from
//! them.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches kind definitions from embedded JSON
//! - [`fetcher`] - Lists a kind through the paginator, extracts payload fields
//! - [`handle`] - [`Resource`], a normalized record bound to its region
//! - [`adapter`] - Create, read, delete, actions, tags, waits
//!
//! # Resource Definitions
//!
//! Kinds are defined in JSON files under `src/resources/`:
//! - `database.json` - Database instances
//! - `network.json` - Elastic IPs, NAT gateways, security groups
//! - `storage.json` - File shares
//! - `loadbalancer.json` - Load balancer backends and certificates
//!
//! # Example
//!
//! ```ignore
//! use regioncloud::{CanonicalStatus, Region};
//!
//! async fn reboot(region: &Region) -> regioncloud::Result<()> {
//!     let dbs = region.adapter("db-instance")?;
//!     dbs.perform("reboot", "db-1", &serde_json::Value::Null).await?;
//!     dbs.wait_for_status("db-1", CanonicalStatus::Running, &region.options().wait)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod fetcher;
pub mod handle;
pub mod registry;

pub use adapter::Adapter;
pub use fetcher::{extract_path, extract_string, fetch_items};
pub use handle::{parse_timestamp, Resource};
pub use registry::*;
