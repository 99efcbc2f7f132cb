//! Region scope
//!
//! A [`Region`] owns the transport and the session context (region name,
//! project id, wait/paging options). Resource handles borrow it; it outlives
//! every handle created from it.

use super::transport::{Method, Transport};
use crate::error::{CloudError, Result};
use crate::job::{Job, JobEndpoint};
use crate::resource::{get_kind, get_registry, Adapter};
use crate::waiter::{wait_until, WaitOptions};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Default page size requested from list endpoints
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Per-region tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOptions {
    pub wait: WaitOptions,
    pub page_size: usize,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Region scope shared by all adapters and handles
pub struct Region {
    name: String,
    project_id: String,
    transport: Arc<dyn Transport>,
    options: RegionOptions,
    /// Instance-type catalogs, populated once per kind
    catalogs: HashMap<String, OnceLock<Vec<Value>>>,
}

impl Region {
    /// Create a region scope over an authenticated transport
    pub fn new(name: &str, project_id: &str, transport: Arc<dyn Transport>) -> Self {
        let catalogs = get_registry()
            .kinds
            .values()
            .filter(|def| def.catalog.is_some())
            .map(|def| (def.key.clone(), OnceLock::new()))
            .collect();

        Self {
            name: name.to_string(),
            project_id: project_id.to_string(),
            transport,
            options: RegionOptions::default(),
            catalogs,
        }
    }

    pub fn with_options(mut self, options: RegionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn options(&self) -> &RegionOptions {
        &self.options
    }

    /// Substitute `{project}`, `{region}` and `{id}` in a path template
    pub fn expand(&self, template: &str, id: &str) -> String {
        template
            .replace("{project}", &self.project_id)
            .replace("{region}", &self.name)
            .replace("{id}", id)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub async fn request(
        &self,
        method: Method,
        service: &str,
        path: &str,
        params: &Value,
    ) -> Result<Value> {
        Ok(self.transport.call(method, service, path, params).await?)
    }

    /// Make a GET request; params become the query string
    pub async fn get(&self, service: &str, path: &str, params: &Value) -> Result<Value> {
        self.request(Method::Get, service, path, params).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, service: &str, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Post, service, path, body).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, service: &str, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Put, service, path, body).await
    }

    /// Make a DELETE request; params become the query string
    pub async fn delete(&self, service: &str, path: &str, params: &Value) -> Result<Value> {
        self.request(Method::Delete, service, path, params).await
    }

    // =========================================================================
    // Adapters, jobs, catalogs
    // =========================================================================

    /// Adapter for a registered resource kind
    pub fn adapter(&self, kind: &str) -> Result<Adapter<'_>> {
        let def = get_kind(kind).ok_or_else(|| CloudError::not_supported(kind, "any operation"))?;
        Ok(Adapter::new(self, def))
    }

    /// Fetch one job snapshot
    pub async fn job(&self, endpoint: &JobEndpoint, id: &str) -> Result<Job> {
        let path = self.expand(&endpoint.path, id);
        let response = self.get(&endpoint.service, &path, &Value::Null).await?;
        let body = match &endpoint.field {
            Some(field) => response.get(field).unwrap_or(&response),
            None => &response,
        };
        Job::from_json(id, body)
    }

    /// Poll a job until it succeeds, fails, or the region's wait budget runs out
    pub async fn wait_job(&self, endpoint: &JobEndpoint, id: &str) -> Result<Job> {
        self.wait_job_with(endpoint, id, &self.options.wait).await
    }

    pub async fn wait_job_with(
        &self,
        endpoint: &JobEndpoint,
        id: &str,
        opts: &WaitOptions,
    ) -> Result<Job> {
        tracing::info!("Waiting for job {} ({})", id, endpoint.service);
        let job = wait_until(
            || self.job(endpoint, id),
            |job: &Job| job.status.is_terminal(),
            |_| false,
            opts,
            &format!("job {}", id),
        )
        .await?;

        if job.is_failed() {
            return Err(job.failure());
        }
        Ok(job)
    }

    /// Instance types offered for `kind`, fetched once per region
    pub async fn instance_types(&self, kind: &str) -> Result<&[Value]> {
        self.adapter(kind)?.instance_types().await
    }

    pub(crate) fn catalog_cell(&self, kind: &str) -> Option<&OnceLock<Vec<Value>>> {
        self.catalogs.get(kind)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("project_id", &self.project_id)
            .field("options", &self.options)
            .finish()
    }
}
