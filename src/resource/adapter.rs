//! Resource Adapter
//!
//! Canonical lifecycle operations for one resource kind, driven by its
//! registry definition. Lists go through the paginator, records through the
//! status normalizer, and asynchronous provider calls through the waiter.

use super::fetcher::{extract_items, extract_path, extract_string, fetch_items};
use super::handle::Resource;
use super::registry::KindDef;
use crate::client::{Method, Region};
use crate::error::{CloudError, Result, ResultExt};
use crate::status::CanonicalStatus;
use crate::tags::{plan, tags_from_json, tags_to_json, TagPlan, TagSet};
use crate::waiter::{wait_until, WaitOptions};
use serde_json::{json, Map, Value};

/// Adapter for one resource kind within a region
#[derive(Debug, Clone, Copy)]
pub struct Adapter<'r> {
    region: &'r Region,
    def: &'static KindDef,
}

/// Replace `{project}`, `{region}` and `{id}` in every string of a JSON value
fn fill_placeholders(region: &Region, value: &Value, id: &str) -> Value {
    match value {
        Value::String(s) => Value::String(region.expand(s, id)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| fill_placeholders(region, v, id))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_placeholders(region, v, id)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Deep-merge `overlay` into `base`; overlay wins on conflicts
fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_json(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        },
        (base, overlay) if !overlay.is_null() => *base = overlay.clone(),
        _ => {},
    }
}

impl<'r> Adapter<'r> {
    pub fn new(region: &'r Region, def: &'static KindDef) -> Self {
        Self { region, def }
    }

    pub fn kind(&self) -> &'static KindDef {
        self.def
    }

    pub fn region(&self) -> &'r Region {
        self.region
    }

    fn key(&self) -> &'static str {
        &self.def.key
    }

    fn unsupported(&self, operation: &str) -> CloudError {
        tracing::debug!("{} does not support {}", self.key(), operation);
        CloudError::not_supported(self.key(), operation)
    }

    fn item_path(&self, id: &str) -> Option<String> {
        self.def
            .item_path
            .as_deref()
            .map(|template| self.region.expand(template, id))
    }

    fn to_resource(&self, raw: Value) -> Result<Resource<'r>> {
        Resource::from_json(self.region, self.def, raw)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// List resources. An empty `id` lists all of them.
    pub async fn list(&self, id: &str) -> Result<Vec<Resource<'r>>> {
        if id.is_empty() {
            return self.list_filtered(&Value::Null).await;
        }

        match &self.def.id_param {
            Some(param) => {
                let mut filter = Map::new();
                filter.insert(param.clone(), Value::from(id));
                let found = self.list_filtered(&Value::Object(filter)).await?;
                Ok(found.into_iter().filter(|r| r.id == id).collect())
            },
            None => match self.get(id).await {
                Ok(resource) => Ok(vec![resource]),
                Err(e) if e.is_not_found() => Ok(Vec::new()),
                Err(e) => Err(e),
            },
        }
    }

    /// List resources matching provider query filters
    pub async fn list_filtered(&self, filters: &Value) -> Result<Vec<Resource<'r>>> {
        let items = fetch_items(self.region, self.def, filters)
            .await
            .with_context(self.key(), "", "list")?;

        items
            .into_iter()
            .map(|raw| self.to_resource(raw))
            .collect::<Result<Vec<_>>>()
            .with_context(self.key(), "", "list")
    }

    /// Fetch a single resource by id
    pub async fn get(&self, id: &str) -> Result<Resource<'r>> {
        let Some(path) = self.item_path(id) else {
            let filter = match &self.def.id_param {
                Some(param) => json!({ param.as_str(): id }),
                None => Value::Null,
            };
            let found = self
                .list_filtered(&filter)
                .await?
                .into_iter()
                .find(|r| r.id == id);
            return found.ok_or_else(|| CloudError::not_found(self.key(), id));
        };

        let response = match self.region.get(&self.def.service, &path, &Value::Null).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Err(CloudError::not_found(self.key(), id)),
            Err(e) => return Err(e).with_context(self.key(), id, "get"),
        };

        let raw = match &self.def.item_field {
            Some(field) => response
                .get(field)
                .cloned()
                .ok_or_else(|| CloudError::Decode(format!("response has no {} field", field)))
                .with_context(self.key(), id, "get")?,
            None => response,
        };

        self.to_resource(raw).with_context(self.key(), id, "get")
    }

    /// Re-fetch `resource` by id and merge fresh fields in place
    pub async fn refresh(&self, resource: &mut Resource<'r>) -> Result<()> {
        let fresh = self.get(&resource.id).await?;
        resource.absorb(fresh);
        Ok(())
    }

    /// Populate-once instance-type catalog for this kind
    pub async fn instance_types(&self) -> Result<&'r [Value]> {
        let Some(catalog) = &self.def.catalog else {
            return Err(self.unsupported("instance types"));
        };
        let Some(cell) = self.region.catalog_cell(self.key()) else {
            return Err(self.unsupported("instance types"));
        };

        if let Some(types) = cell.get() {
            return Ok(types.as_slice());
        }

        let path = self.region.expand(&catalog.path, "");
        let response = self
            .region
            .get(&self.def.service, &path, &Value::Null)
            .await
            .with_context(self.key(), "", "list instance types of")?;
        let types = extract_items(&response, &catalog.field);
        tracing::debug!("Cached {} instance types for {}", types.len(), self.key());

        // Concurrent callers may both fetch; the first stored list is kept
        Ok(cell.get_or_init(|| types).as_slice())
    }

    // =========================================================================
    // Create / delete
    // =========================================================================

    /// Create a resource and wait for the provider to finish building it.
    ///
    /// Waits on the returned job when there is one, otherwise on the
    /// resource itself if the kind asks for it. A wait timeout is an error.
    pub async fn create(&self, spec: &Value) -> Result<Resource<'r>> {
        let Some(create) = &self.def.create else {
            return Err(self.unsupported("create"));
        };

        let mut spec = spec.clone();
        if let Some(field) = &create.client_token_field {
            if let Value::Object(map) = &mut spec {
                map.entry(field.clone())
                    .or_insert_with(|| Value::from(uuid::Uuid::new_v4().to_string()));
            }
        }
        let body = match &create.wrap {
            Some(wrap) => json!({ wrap.as_str(): spec }),
            None => spec,
        };

        let path = self.region.expand(&self.def.collection_path, "");
        tracing::info!("Creating {} in {}", self.key(), self.region.name());

        let response = self
            .region
            .post(&self.def.service, &path, &body)
            .await
            .with_context(self.key(), "", "create")?;

        let id = extract_string(&response, &create.id_path).ok_or_else(|| {
            CloudError::Decode(format!("create response has no {}", create.id_path))
                .context(format!("create {}", self.key()))
        })?;

        let job_id = create
            .job_field
            .as_deref()
            .and_then(|field| extract_string(&response, field));

        if let Some(job_id) = job_id {
            tracing::info!("{} {} is being built by job {}", self.key(), id, job_id);
            self.region
                .wait_job(&self.def.job_endpoint(), &job_id)
                .await
                .with_context(self.key(), &id, "create")?;
        } else if create.wait_after_create {
            return self
                .wait_settled(&id, &self.region.options().wait)
                .await
                .with_context(self.key(), &id, "create");
        }

        self.get(&id).await.with_context(self.key(), &id, "create")
    }

    /// Poll the resource itself until it leaves its transitional states
    async fn wait_settled(&self, id: &str, opts: &WaitOptions) -> Result<Resource<'r>> {
        wait_until(
            || self.get(id),
            |r: &Resource<'r>| r.status.canonical().is_settled(),
            |r: &Resource<'r>| r.status.is_failed(),
            opts,
            &format!("{} {}", self.key(), id),
        )
        .await
    }

    /// Issue the provider delete call. Does not wait for the resource to go.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.delete_call(id).await.map(|_| ())
    }

    async fn delete_call(&self, id: &str) -> Result<Option<String>> {
        if !self.def.deletable {
            return Err(self.unsupported("delete"));
        }
        let path = self.item_path(id).unwrap_or_else(|| {
            format!("{}/{}", self.region.expand(&self.def.collection_path, ""), id)
        });

        tracing::info!("Deleting {} {}", self.key(), id);
        let response = self
            .region
            .delete(&self.def.service, &path, &Value::Null)
            .await
            .with_context(self.key(), id, "delete")?;

        Ok(self
            .def
            .delete_job_field
            .as_deref()
            .and_then(|field| extract_string(&response, field)))
    }

    /// Delete and confirm the resource is gone
    pub async fn delete_and_wait(&self, id: &str) -> Result<()> {
        let opts = self.region.options().wait;
        let job_id = self.delete_call(id).await?;

        if let Some(job_id) = job_id {
            self.region
                .wait_job(&self.def.job_endpoint(), &job_id)
                .await
                .with_context(self.key(), id, "delete")?;
        }

        let probe = || async move {
            match self.get(id).await {
                Ok(resource) => Ok(Some(resource)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            }
        };

        let what = format!("{} {} to be deleted", self.key(), id);
        wait_until(probe, |r: &Option<Resource<'r>>| r.is_none(), |_| false, &opts, &what)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Run a named provider action (`reboot`, `resize`, ...) on a resource.
    ///
    /// `body` is merged over the action's default body. When the provider
    /// answers with a job, waits for it and returns the final job entities.
    pub async fn perform(&self, action: &str, id: &str, body: &Value) -> Result<Value> {
        let Some(def) = self.def.action(action) else {
            return Err(self.unsupported(action));
        };
        let Some(method) = Method::from_name(&def.method) else {
            return Err(self.unsupported(action));
        };

        let mut request = fill_placeholders(self.region, &def.body, id);
        merge_json(&mut request, body);
        let path = self.region.expand(&def.path, id);

        tracing::info!("{} {} {}", def.display_name, self.key(), id);
        let response = self
            .region
            .request(method, &self.def.service, &path, &request)
            .await
            .with_context(self.key(), id, action)?;

        let job_id = def
            .job_field
            .as_deref()
            .and_then(|field| extract_string(&response, field));

        match job_id {
            Some(job_id) => {
                let job = self
                    .region
                    .wait_job(&self.def.job_endpoint(), &job_id)
                    .await
                    .with_context(self.key(), id, action)?;
                Ok(job.entities)
            },
            None => Ok(response),
        }
    }

    /// Wait for a resource to reach `wanted`
    pub async fn wait_for_status(
        &self,
        id: &str,
        wanted: CanonicalStatus,
        opts: &WaitOptions,
    ) -> Result<Resource<'r>> {
        wait_until(
            || self.get(id),
            |r: &Resource<'r>| r.status.canonical() == wanted,
            |r: &Resource<'r>| r.status.is_failed(),
            opts,
            &format!("{} {} to become {}", self.key(), id, wanted),
        )
        .await
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Current tags of a resource
    pub async fn tags(&self, id: &str) -> Result<TagSet> {
        let Some(tags) = &self.def.tags else {
            return Err(self.unsupported("tags"));
        };

        let path = self.region.expand(&tags.list_path, id);
        let response = self
            .region
            .get(&self.def.service, &path, &Value::Null)
            .await
            .with_context(self.key(), id, "read tags of")?;

        Ok(extract_path(&response, &tags.list_field)
            .map(tags_from_json)
            .unwrap_or_default())
    }

    /// Reconcile tags towards `desired`: delete affected keys, then add.
    ///
    /// Not rolled back if the add fails after the delete; calling again
    /// recomputes the plan from the new state.
    pub async fn set_tags(&self, id: &str, desired: &TagSet, replace: bool) -> Result<TagPlan> {
        let Some(tags) = &self.def.tags else {
            return Err(self.unsupported("tags"));
        };

        let existing = self.tags(id).await?;
        let plan = plan(&existing, desired, replace);
        let path = self.region.expand(&tags.action_path, id);

        if !plan.delete.is_empty() {
            let keys: Vec<Value> = plan.delete.iter().map(|k| json!({ "key": k })).collect();
            tracing::debug!("Deleting {} tags from {} {}", keys.len(), self.key(), id);
            self.region
                .post(
                    &self.def.service,
                    &path,
                    &json!({ "action": "delete", "tags": keys }),
                )
                .await
                .with_context(self.key(), id, "delete tags of")?;
        }

        if !plan.add.is_empty() {
            tracing::debug!("Adding {} tags to {} {}", plan.add.len(), self.key(), id);
            self.region
                .post(
                    &self.def.service,
                    &path,
                    &json!({ "action": "create", "tags": tags_to_json(&plan.add) }),
                )
                .await
                .with_context(self.key(), id, "add tags to")?;
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::mock::MockTransport;
    use crate::client::RegionOptions;
    use crate::error::{ErrorKind, TransportError};
    use std::sync::Arc;
    use std::time::Duration;

    fn region(mock: Arc<MockTransport>) -> Region {
        Region::new("r1", "p1", mock).with_options(RegionOptions {
            wait: WaitOptions::new(Duration::from_secs(1), Duration::from_secs(10)),
            page_size: 50,
        })
    }

    fn tagset(pairs: &[(&str, &str)]) -> TagSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_json_overlays() {
        let mut base = json!({"resize_flavor": {"spec_code": "old"}, "keep": 1});
        merge_json(&mut base, &json!({"resize_flavor": {"spec_code": "new"}}));
        assert_eq!(base, json!({"resize_flavor": {"spec_code": "new"}, "keep": 1}));
    }

    #[tokio::test]
    async fn test_unsupported_operations_make_no_calls() {
        let mock = Arc::new(MockTransport::new());
        let region = region(mock.clone());
        let backends = region.adapter("lb-backend").unwrap();

        let err = backends.set_tags("m-1", &tagset(&[("a", "1")]), false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = backends.perform("reboot", "m-1", &Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = backends.instance_types().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_id_lists_all_and_id_filters() {
        let mock = Arc::new(MockTransport::new());
        let route = "rds/p1/instances";
        mock.ok(
            Method::Get,
            route,
            json!({"instances": [{"id": "a", "status": "ACTIVE"}, {"id": "b", "status": "BUILD"}], "total_count": 2}),
        );
        mock.ok(
            Method::Get,
            route,
            json!({"instances": [{"id": "b2", "status": "ACTIVE"}, {"id": "b", "status": "BUILD"}], "total_count": 2}),
        );

        let region = region(mock.clone());
        let dbs = region.adapter("db-instance").unwrap();

        let all = dbs.list("").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[1].status.is_busy());

        let one = dbs.list("b").await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, "b");
        assert_eq!(mock.calls()[1].2["id"], "b");
    }

    #[tokio::test]
    async fn test_get_maps_404_to_not_found() {
        let mock = Arc::new(MockTransport::new());
        mock.push(
            Method::Get,
            "vpc/p1/publicips/eip-9",
            Err(TransportError::Status { code: 404, message: "missing".into() }),
        );

        let region = region(mock);
        let err = region.adapter("elastic-ip").unwrap().get("eip-9").await.unwrap_err();
        match err {
            CloudError::NotFound { kind, id } => {
                assert_eq!(kind, "elastic-ip");
                assert_eq!(id, "eip-9");
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_without_item_field_names_the_resource() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Get, "vpc/p1/publicips/eip-1", json!({}));

        let region = region(mock);
        let err = region.adapter("elastic-ip").unwrap().get("eip-1").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().starts_with("get elastic-ip eip-1:"));
    }

    #[tokio::test]
    async fn test_get_via_list_filter_not_found() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Get, "rds/p1/instances", json!({"instances": [], "total_count": 0}));

        let region = region(mock);
        let err = region.adapter("db-instance").unwrap().get("db-x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_job() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(
            Method::Post,
            "rds/p1/instances",
            json!({"instance": {"id": "db-1"}, "job_id": "j-1"}),
        );
        mock.ok(Method::Get, "rds/p1/jobs/j-1", json!({"job": {"id": "j-1", "status": "RUNNING"}}));
        mock.ok(Method::Get, "rds/p1/jobs/j-1", json!({"job": {"id": "j-1", "status": "SUCCESS"}}));
        mock.ok(
            Method::Get,
            "rds/p1/instances",
            json!({"instances": [{"id": "db-1", "name": "orders", "status": "ACTIVE"}], "total_count": 1}),
        );

        let region = region(mock.clone());
        let db = region
            .adapter("db-instance")
            .unwrap()
            .create(&json!({"name": "orders"}))
            .await
            .unwrap();

        assert_eq!(db.id, "db-1");
        assert_eq!(db.status.canonical(), CanonicalStatus::Running);
        assert_eq!(mock.count(Method::Get, "rds/p1/jobs/j-1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_job_failure_is_reported() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(
            Method::Post,
            "rds/p1/instances",
            json!({"instance": {"id": "db-2"}, "job_id": "j-2"}),
        );
        mock.ok(
            Method::Get,
            "rds/p1/jobs/j-2",
            json!({"job": {"id": "j-2", "status": "FAIL", "fail_reason": "no capacity"}}),
        );

        let region = region(mock);
        let err = region
            .adapter("db-instance")
            .unwrap()
            .create(&json!({"name": "orders"}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        let text = err.to_string();
        assert!(text.contains("create db-instance db-2"));
        assert!(text.contains("no capacity"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_polls_resource_and_adds_client_token() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Post, "vpc/p1/publicips", json!({"publicip": {"id": "eip-1"}}));
        mock.ok(
            Method::Get,
            "vpc/p1/publicips/eip-1",
            json!({"publicip": {"id": "eip-1", "status": "PENDING_CREATE"}}),
        );
        mock.ok(
            Method::Get,
            "vpc/p1/publicips/eip-1",
            json!({"publicip": {"id": "eip-1", "status": "DOWN"}}),
        );

        let region = region(mock.clone());
        let eip = region
            .adapter("elastic-ip")
            .unwrap()
            .create(&json!({"bandwidth": 5}))
            .await
            .unwrap();

        assert_eq!(eip.status.canonical(), CanonicalStatus::Ready);
        let body = &mock.calls()[0].2;
        assert!(body["client_token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["bandwidth"], 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_wait_timeout_is_an_error() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Post, "nat/p1/nat_gateways", json!({"nat_gateway": {"id": "nat-1"}}));
        mock.always(
            Method::Get,
            "nat/p1/nat_gateways/nat-1",
            Ok(json!({"nat_gateway": {"id": "nat-1", "status": "PENDING_CREATE"}})),
        );

        let region = region(mock.clone());
        let err = region
            .adapter("nat-gateway")
            .unwrap()
            .create(&json!({"name": "egress"}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.calls()[0].2, json!({"nat_gateway": {"name": "egress"}}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_and_wait_until_gone() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Delete, "vpc/p1/security-groups/sg-1", Value::Null);
        mock.ok(
            Method::Get,
            "vpc/p1/security-groups/sg-1",
            json!({"security_group": {"id": "sg-1"}}),
        );
        mock.push(
            Method::Get,
            "vpc/p1/security-groups/sg-1",
            Err(TransportError::Status { code: 404, message: "gone".into() }),
        );

        let region = region(mock.clone());
        region
            .adapter("security-group")
            .unwrap()
            .delete_and_wait("sg-1")
            .await
            .unwrap();

        assert_eq!(mock.count(Method::Get, "vpc/p1/security-groups/sg-1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_and_wait_timeout_keeps_last_error() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Delete, "vpc/p1/security-groups/sg-1", Value::Null);
        mock.always(
            Method::Get,
            "vpc/p1/security-groups/sg-1",
            Err(TransportError::Status { code: 500, message: "backend down".into() }),
        );

        let region = region(mock);
        let err = region
            .adapter("security-group")
            .unwrap()
            .delete_and_wait("sg-1")
            .await
            .unwrap_err();

        match err {
            CloudError::Timeout { what, last_error, .. } => {
                assert!(what.contains("sg-1"));
                assert!(last_error.is_some_and(|e| e.contains("backend down")));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_status_retries_failed_first_read() {
        let mock = Arc::new(MockTransport::new());
        let route = "nat/p1/nat_gateways/nat-1";
        mock.push(
            Method::Get,
            route,
            Err(TransportError::Status { code: 503, message: "busy".into() }),
        );
        mock.always(
            Method::Get,
            route,
            Ok(json!({"nat_gateway": {"id": "nat-1", "status": "ACTIVE"}})),
        );

        let region = region(mock.clone());
        let opts = region.options().wait;
        let nat = region
            .adapter("nat-gateway")
            .unwrap()
            .wait_for_status("nat-1", CanonicalStatus::Running, &opts)
            .await
            .unwrap();

        assert_eq!(nat.status.canonical(), CanonicalStatus::Running);
        assert_eq!(mock.count(Method::Get, route), 2);
    }

    #[tokio::test]
    async fn test_delete_surfaces_provider_not_found() {
        let mock = Arc::new(MockTransport::new());
        let region = region(mock);
        let err = region
            .adapter("lb-certificate")
            .unwrap()
            .delete("cert-gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_perform_action_waits_for_job() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Post, "rds/p1/instances/db-1/action", json!({"job_id": "j-9"}));
        mock.ok(
            Method::Get,
            "rds/p1/jobs/j-9",
            json!({"job": {"id": "j-9", "status": "SUCCESS", "entities": {"instance_id": "db-1"}}}),
        );

        let region = region(mock.clone());
        let entities = region
            .adapter("db-instance")
            .unwrap()
            .perform("resize", "db-1", &json!({"resize_flavor": {"spec_code": "large"}}))
            .await
            .unwrap();

        assert_eq!(entities["instance_id"], "db-1");
        assert_eq!(mock.calls()[0].2, json!({"resize_flavor": {"spec_code": "large"}}));
    }

    #[tokio::test]
    async fn test_perform_fills_placeholders() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(Method::Post, "rds/p1/backups", json!({"backup": {"id": "bk-1"}}));

        let region = region(mock.clone());
        region
            .adapter("db-instance")
            .unwrap()
            .perform("backup", "db-1", &json!({"name": "nightly"}))
            .await
            .unwrap();

        assert_eq!(
            mock.calls()[0].2,
            json!({"instance_id": "db-1", "name": "nightly"})
        );
    }

    #[tokio::test]
    async fn test_set_tags_merge_deletes_then_adds() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(
            Method::Get,
            "nat/p1/nat_gateways/nat-1/tags",
            json!({"tags": [{"key": "a", "value": "1"}, {"key": "b", "value": "2"}]}),
        );
        mock.ok(Method::Post, "nat/p1/nat_gateways/nat-1/tags/action", Value::Null);
        mock.ok(Method::Post, "nat/p1/nat_gateways/nat-1/tags/action", Value::Null);

        let region = region(mock.clone());
        let plan = region
            .adapter("nat-gateway")
            .unwrap()
            .set_tags("nat-1", &tagset(&[("b", "3"), ("c", "4")]), false)
            .await
            .unwrap();

        assert_eq!(plan.delete, vec!["b".to_string()]);
        let calls = mock.calls();
        assert_eq!(calls[1].2, json!({"action": "delete", "tags": [{"key": "b"}]}));
        assert_eq!(
            calls[2].2,
            json!({"action": "create", "tags": [{"key": "b", "value": "3"}, {"key": "c", "value": "4"}]})
        );
    }

    #[tokio::test]
    async fn test_set_tags_add_failure_is_surfaced() {
        let mock = Arc::new(MockTransport::new());
        let action = "vpc/p1/publicips/eip-1/tags/action";
        mock.ok(
            Method::Get,
            "vpc/p1/publicips/eip-1/tags",
            json!({"tags": [{"key": "a", "value": "1"}]}),
        );
        mock.ok(Method::Post, action, Value::Null);
        mock.push(
            Method::Post,
            action,
            Err(TransportError::Status { code: 400, message: "bad tag".into() }),
        );

        let region = region(mock);
        let err = region
            .adapter("elastic-ip")
            .unwrap()
            .set_tags("eip-1", &tagset(&[("z", "9")]), true)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.to_string().contains("add tags to elastic-ip eip-1"));
    }

    #[tokio::test]
    async fn test_instance_types_are_memoized() {
        let mock = Arc::new(MockTransport::new());
        mock.ok(
            Method::Get,
            "rds/p1/flavors",
            json!({"flavors": [{"spec_code": "small"}, {"spec_code": "large"}]}),
        );

        let region = region(mock.clone());
        let dbs = region.adapter("db-instance").unwrap();
        assert_eq!(dbs.instance_types().await.unwrap().len(), 2);
        assert_eq!(dbs.instance_types().await.unwrap().len(), 2);
        assert_eq!(mock.count(Method::Get, "rds/p1/flavors"), 1);
    }
}
