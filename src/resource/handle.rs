//! Resource handles
//!
//! A [`Resource`] is a normalized snapshot of one provider record plus a
//! borrowed back-reference to the [`Region`] it came from, used for refreshes
//! and follow-up calls. The handle never owns or mutates the region.

use super::adapter::Adapter;
use super::fetcher::{extract_path, extract_string};
use super::registry::KindDef;
use crate::client::Region;
use crate::error::{CloudError, Result};
use crate::status::{normalize, CanonicalStatus, Status};
use crate::tags::{tags_from_json, TagSet};
use crate::waiter::{Pollable, WaitOptions};
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::BoxFuture;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

/// One provider resource, normalized
#[derive(Clone)]
pub struct Resource<'r> {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub tags: TagSet,
    pub created_at: Option<DateTime<Utc>>,
    /// Provider record as returned
    pub raw: Value,
    kind: &'static KindDef,
    region: &'r Region,
}

/// Parse the timestamp layouts providers use (RFC 3339, `+0800` offsets,
/// or naive UTC)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl<'r> Resource<'r> {
    /// Normalize a provider record of kind `def`
    pub fn from_json(region: &'r Region, def: &'static KindDef, raw: Value) -> Result<Self> {
        let id = extract_string(&raw, &def.id_field).ok_or_else(|| {
            CloudError::Decode(format!("{} record without {}", def.key, def.id_field))
        })?;

        let name = extract_string(&raw, &def.name_field).unwrap_or_default();

        let status = match def.status_field.as_deref() {
            Some(field) => match extract_path(&raw, field).and_then(|v| v.as_str()) {
                Some(s) => normalize(&def.key, s),
                None => Status::Canonical(CanonicalStatus::Unknown),
            },
            None => Status::Canonical(def.default_status),
        };

        let tags = def
            .tags_field
            .as_deref()
            .and_then(|field| extract_path(&raw, field))
            .map(tags_from_json)
            .unwrap_or_default();

        let created_at = def
            .created_field
            .as_deref()
            .and_then(|field| extract_path(&raw, field))
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp);

        Ok(Self {
            id,
            name,
            status,
            tags,
            created_at,
            raw,
            kind: def,
            region,
        })
    }

    pub fn kind(&self) -> &'static KindDef {
        self.kind
    }

    pub fn region(&self) -> &'r Region {
        self.region
    }

    fn adapter(&self) -> Adapter<'r> {
        Adapter::new(self.region, self.kind)
    }

    /// Re-fetch by id and merge the fresh fields in place
    pub async fn refresh(&mut self) -> Result<()> {
        let fresh = self.adapter().get(&self.id).await?;
        self.absorb(fresh);
        Ok(())
    }

    /// Take every provider-derived field from `fresh`; the region stays
    pub(crate) fn absorb(&mut self, fresh: Resource<'_>) {
        self.id = fresh.id;
        self.name = fresh.name;
        self.status = fresh.status;
        self.tags = fresh.tags;
        self.created_at = fresh.created_at;
        self.raw = fresh.raw;
    }

    /// Wait until the resource reports `wanted`; the handle takes the
    /// snapshot that satisfied the wait
    pub async fn wait_for_status(
        &mut self,
        wanted: CanonicalStatus,
        opts: &WaitOptions,
    ) -> Result<()> {
        let fresh = self.adapter().wait_for_status(&self.id, wanted, opts).await?;
        self.absorb(fresh);
        Ok(())
    }
}

impl Pollable for Resource<'_> {
    fn describe(&self) -> String {
        format!("{} {}", self.kind.key, self.id)
    }

    fn probe_status(&self) -> BoxFuture<'_, Result<Status>> {
        Box::pin(async move { self.adapter().get(&self.id).await.map(|r| r.status) })
    }
}

impl std::fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.kind.key)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("region", &self.region.name())
            .finish()
    }
}

impl PartialEq for Resource<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind.key == other.kind.key
            && self.id == other.id
            && self.name == other.name
            && self.status == other.status
            && self.tags == other.tags
            && self.created_at == other.created_at
            && self.raw == other.raw
    }
}

impl Serialize for Resource<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Resource", 8)?;
        s.serialize_field("kind", &self.kind.key)?;
        s.serialize_field("region", self.region.name())?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("status", self.status.as_str())?;
        s.serialize_field("tags", &self.tags)?;
        s.serialize_field("created_at", &self.created_at.map(|t| t.to_rfc3339()))?;
        s.serialize_field("raw", &self.raw)?;
        s.end()
    }
}
