//! Region-scoped cloud REST adapter
//!
//! Presents heterogeneous provider resources (database instances, elastic
//! IPs, NAT gateways, file shares, load balancer members, ...) behind one
//! lifecycle: list, get, create, delete, act, tag and wait. The provider's
//! own quirks stay in data files; the [`resource::Adapter`] reads them.
//!
//! - [`paginate`] merges offset- and marker-paged listings
//! - [`status`] maps provider status strings onto [`CanonicalStatus`]
//! - [`waiter`] polls jobs and resources against a monotonic deadline
//! - [`tags`] plans delete-then-add tag changes

pub mod client;
pub mod error;
pub mod job;
pub mod paginate;
pub mod resource;
pub mod status;
pub mod tags;
pub mod waiter;

pub use client::{HttpTransport, Method, Region, RegionOptions, Transport};
pub use error::{CloudError, ErrorKind, Result, TransportError};
pub use job::{Job, JobStatus};
pub use resource::{Adapter, Resource};
pub use status::{CanonicalStatus, Status};
pub use tags::{TagPlan, TagSet};
pub use waiter::WaitOptions;
