//! Resource Registry - Load resource kind definitions from JSON
//!
//! Every kind the adapter knows is described by data in embedded JSON files:
//! where it lives, which response fields carry id/name/status, how it pages,
//! which operations exist. Operations a kind does not declare are reported
//! as not supported without touching the network.

use crate::job::JobEndpoint;
use crate::paginate::PageStyle;
use crate::status::CanonicalStatus;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/database.json"),
    include_str!("../resources/network.json"),
    include_str!("../resources/storage.json"),
    include_str!("../resources/loadbalancer.json"),
];

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_marker_param() -> String {
    "marker".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_status() -> CanonicalStatus {
    CanonicalStatus::Unknown
}

/// Pagination parameters and response fields
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationDef {
    pub style: PageStyle,
    #[serde(default = "default_limit_param")]
    pub limit_param: String,
    #[serde(default = "default_offset_param")]
    pub offset_param: String,
    #[serde(default = "default_marker_param")]
    pub marker_param: String,
    /// Dotted path of the total-count hint
    #[serde(default)]
    pub total_field: Option<String>,
    /// Dotted path of the next-page marker
    #[serde(default)]
    pub marker_field: Option<String>,
    /// Dotted path of a "more pages" boolean
    #[serde(default)]
    pub more_field: Option<String>,
}

/// Creation call description
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDef {
    /// Field the request spec is wrapped in, e.g. `{"nat_gateway": spec}`
    #[serde(default)]
    pub wrap: Option<String>,
    /// Dotted path of the new resource id in the response
    pub id_path: String,
    /// Dotted path of the job id in the response
    #[serde(default)]
    pub job_field: Option<String>,
    /// Request field receiving a generated idempotency token
    #[serde(default)]
    pub client_token_field: Option<String>,
    /// Poll the resource itself until it leaves `creating`
    #[serde(default)]
    pub wait_after_create: bool,
}

/// Tag endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TagsDef {
    /// Path template returning current tags
    pub list_path: String,
    pub list_field: String,
    /// Path template accepting `{"action": "create"|"delete", "tags": [...]}`
    pub action_path: String,
}

/// Named provider action on a single resource
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDef {
    pub key: String,
    pub display_name: String,
    pub method: String,
    /// Path template with `{project}` and `{id}` placeholders
    pub path: String,
    /// Default body, merged under caller-supplied fields
    #[serde(default)]
    pub body: Value,
    /// Dotted path of a job id in the response
    #[serde(default)]
    pub job_field: Option<String>,
}

/// Instance-type catalog lookup
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDef {
    pub path: String,
    pub field: String,
}

/// Resource kind definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct KindDef {
    /// Registry key, filled in after loading
    #[serde(skip)]
    pub key: String,
    pub display_name: String,
    pub service: String,
    /// Path template of the collection (list + create)
    pub collection_path: String,
    /// Path template of one item; without it `get` lists with an id filter
    #[serde(default)]
    pub item_path: Option<String>,
    /// Dotted path of the item array in list responses
    pub list_field: String,
    /// Field wrapping the item in get responses
    #[serde(default)]
    pub item_field: Option<String>,
    /// List query parameter filtering by id
    #[serde(default)]
    pub id_param: Option<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default)]
    pub status_field: Option<String>,
    /// Status reported when the provider has no status field
    #[serde(default = "default_status")]
    pub default_status: CanonicalStatus,
    /// Field carrying tags inside the item itself
    #[serde(default)]
    pub tags_field: Option<String>,
    #[serde(default)]
    pub created_field: Option<String>,
    pub pagination: PaginationDef,
    #[serde(default)]
    pub create: Option<CreateDef>,
    #[serde(default)]
    pub deletable: bool,
    #[serde(default)]
    pub delete_job_field: Option<String>,
    #[serde(default)]
    pub jobs: Option<JobEndpoint>,
    #[serde(default)]
    pub tags: Option<TagsDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub catalog: Option<CatalogDef>,
}

impl KindDef {
    pub fn action(&self, key: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Job endpoint for this kind (service default when not declared)
    pub fn job_endpoint(&self) -> JobEndpoint {
        self.jobs.clone().unwrap_or_else(|| JobEndpoint {
            service: self.service.clone(),
            ..JobEndpoint::default()
        })
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub kinds: HashMap<String, KindDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            kinds: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.kinds.extend(partial.kinds);
        }

        for (key, def) in final_config.kinds.iter_mut() {
            def.key = key.clone();
        }

        final_config
    })
}

/// Get a kind definition by key
pub fn get_kind(key: &str) -> Option<&'static KindDef> {
    get_registry().kinds.get(key)
}

/// All kind keys, sorted
pub fn get_all_kind_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .kinds
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}
