//! Operations invoked by bot commands, HTTP handlers and maintenance scripts.
//!
//! Every mutating call follows load -> authorize -> transform -> save inside
//! the tenant's critical section, see [`DocumentStore::update`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::access;
use crate::document::{PrincipalId, TripDocument};
use crate::error::{Result, StoreError};
use crate::store::DocumentStore;
use crate::tenant::TenantKey;

/// An ordered collection inside a trip document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionPath {
    Days,
    Accoms,
    Weather,
    WxLocations,
    Links,
    Refs,
    RefCats,
    Emergency,
    GroupChecklist,
    /// `days/<dayId>/stops`
    Stops { day_id: String },
    /// `groupChecklist/<categoryId>/items`
    ChecklistItems { category_id: String },
}

impl FromStr for CollectionPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let path = match parts.as_slice() {
            ["days"] => CollectionPath::Days,
            ["accoms"] => CollectionPath::Accoms,
            ["weather"] => CollectionPath::Weather,
            ["wxLocations"] => CollectionPath::WxLocations,
            ["links"] => CollectionPath::Links,
            ["refs"] => CollectionPath::Refs,
            ["refCats"] => CollectionPath::RefCats,
            ["emergency"] => CollectionPath::Emergency,
            ["groupChecklist"] => CollectionPath::GroupChecklist,
            ["days", id, "stops"] if !id.is_empty() => CollectionPath::Stops {
                day_id: id.to_string(),
            },
            ["groupChecklist", id, "items"] if !id.is_empty() => CollectionPath::ChecklistItems {
                category_id: id.to_string(),
            },
            _ => return Err(StoreError::validation(format!("unknown collection `{s}`"))),
        };
        Ok(path)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionPath::Days => f.write_str("days"),
            CollectionPath::Accoms => f.write_str("accoms"),
            CollectionPath::Weather => f.write_str("weather"),
            CollectionPath::WxLocations => f.write_str("wxLocations"),
            CollectionPath::Links => f.write_str("links"),
            CollectionPath::Refs => f.write_str("refs"),
            CollectionPath::RefCats => f.write_str("refCats"),
            CollectionPath::Emergency => f.write_str("emergency"),
            CollectionPath::GroupChecklist => f.write_str("groupChecklist"),
            CollectionPath::Stops { day_id } => write!(f, "days/{day_id}/stops"),
            CollectionPath::ChecklistItems { category_id } => {
                write!(f, "groupChecklist/{category_id}/items")
            }
        }
    }
}

impl Serialize for CollectionPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CollectionPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Top-level scalar fields of the `trip` record. `None` leaves a field as is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
}

/// Resolves `$path` to the matching `Vec` in `$doc` and evaluates `$body`
/// with it bound to `$items`.
macro_rules! with_collection {
    ($doc:expr, $path:expr, $items:ident => $body:expr) => {
        match $path {
            CollectionPath::Days => {
                let $items = &mut $doc.days;
                $body
            }
            CollectionPath::Accoms => {
                let $items = &mut $doc.accoms;
                $body
            }
            CollectionPath::Weather => {
                let $items = &mut $doc.weather;
                $body
            }
            CollectionPath::WxLocations => {
                let $items = &mut $doc.wx_locations;
                $body
            }
            CollectionPath::Links => {
                let $items = &mut $doc.links;
                $body
            }
            CollectionPath::Refs => {
                let $items = $doc.refs.get_or_insert_with(Vec::new);
                $body
            }
            CollectionPath::RefCats => {
                let $items = $doc.ref_cats.get_or_insert_with(Vec::new);
                $body
            }
            CollectionPath::Emergency => {
                let $items = &mut $doc.emergency;
                $body
            }
            CollectionPath::GroupChecklist => {
                let $items = &mut $doc.group_checklist;
                $body
            }
            CollectionPath::Stops { day_id } => {
                let day = $doc
                    .day_mut(day_id)
                    .ok_or_else(|| StoreError::not_found(format!("day `{day_id}`")))?;
                let $items = &mut day.stops;
                $body
            }
            CollectionPath::ChecklistItems { category_id } => {
                let category = $doc.checklist_category_mut(category_id).ok_or_else(|| {
                    StoreError::not_found(format!("checklist category `{category_id}`"))
                })?;
                let $items = &mut category.items;
                $body
            }
        }
    };
}

fn push_item<T: DeserializeOwned>(
    items: &mut Vec<T>,
    item: Value,
    path: &CollectionPath,
) -> Result<()> {
    let parsed = serde_json::from_value(item)
        .map_err(|e| StoreError::validation(format!("invalid {path} item: {e}")))?;
    items.push(parsed);
    Ok(())
}

fn take_item<T: Serialize>(items: &mut Vec<T>, index: usize, path: &CollectionPath) -> Result<Value> {
    if index >= items.len() {
        return Err(StoreError::not_found(format!(
            "{path}[{index}] (collection has {} items)",
            items.len()
        )));
    }
    let removed = items.remove(index);
    serde_json::to_value(removed).map_err(|e| StoreError::storage(e.to_string()))
}

/// Appends `item` to the collection named by `path`.
pub fn append_item(doc: &mut TripDocument, path: &CollectionPath, item: Value) -> Result<()> {
    with_collection!(doc, path, items => push_item(items, item, path))
}

/// Removes and returns the element at `index`. Positions past the end are
/// reported as not found; there is no negative indexing.
pub fn remove_item(doc: &mut TripDocument, path: &CollectionPath, index: usize) -> Result<Value> {
    with_collection!(doc, path, items => take_item(items, index, path))
}

pub fn apply_trip_fields(doc: &mut TripDocument, fields: TripFields) {
    if let Some(name) = fields.name {
        doc.trip.name = name;
    }
    if let Some(dates) = fields.dates {
        doc.trip.dates = Some(dates);
    }
}

/// Facade over the store used by every presentation layer.
#[derive(Clone)]
pub struct TripService {
    store: Arc<DocumentStore>,
}

impl TripService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn get_document(&self, tenant: &TenantKey) -> Result<TripDocument> {
        self.store.get_document(tenant)
    }

    /// Whole-document replacement; used by the web app and offline scripts.
    pub fn replace_document(&self, tenant: &TenantKey, value: Value) -> Result<TripDocument> {
        let doc = self.store.save_document_value(tenant, value)?;
        info!(%tenant, "document replaced");
        Ok(doc)
    }

    pub fn is_authorized(&self, tenant: &TenantKey, principal: PrincipalId) -> Result<bool> {
        let doc = self.store.get_document(tenant)?;
        Ok(access::is_authorized(principal, &doc))
    }

    pub fn add_admin(
        &self,
        tenant: &TenantKey,
        requester: PrincipalId,
        new_admin: PrincipalId,
    ) -> Result<TripDocument> {
        let (doc, ()) = self.store.update(tenant, |doc| {
            *doc = access::add_admin(requester, new_admin, doc.clone())?;
            Ok(())
        })?;
        Ok(doc)
    }

    pub fn append_to_collection(
        &self,
        tenant: &TenantKey,
        principal: PrincipalId,
        path: &CollectionPath,
        item: Value,
    ) -> Result<TripDocument> {
        let (doc, ()) = self.store.update(tenant, |doc| {
            access::ensure_authorized(principal, doc)?;
            append_item(doc, path, item)
        })?;
        info!(%tenant, %principal, collection = %path, "item appended");
        Ok(doc)
    }

    /// Index-based removal assumes the caller's view of the collection is
    /// current. Within one process the tenant lock keeps load and save
    /// together, but a stale index from an earlier read still removes
    /// whatever sits at that position now.
    pub fn remove_by_index(
        &self,
        tenant: &TenantKey,
        principal: PrincipalId,
        path: &CollectionPath,
        index: usize,
    ) -> Result<Value> {
        let (_, removed) = self.store.update(tenant, |doc| {
            access::ensure_authorized(principal, doc)?;
            remove_item(doc, path, index)
        })?;
        info!(%tenant, %principal, collection = %path, index, "item removed");
        Ok(removed)
    }

    pub fn replace_scalar_fields(
        &self,
        tenant: &TenantKey,
        principal: PrincipalId,
        fields: TripFields,
    ) -> Result<TripDocument> {
        let (doc, ()) = self.store.update(tenant, |doc| {
            access::ensure_authorized(principal, doc)?;
            apply_trip_fields(doc, fields);
            Ok(())
        })?;
        info!(%tenant, %principal, "trip info updated");
        Ok(doc)
    }

    /// Tick or untick a group checklist item. Unticked items are dropped from
    /// the progress map rather than stored as `false`.
    pub fn set_progress(
        &self,
        tenant: &TenantKey,
        principal: PrincipalId,
        item_key: &str,
        checked: bool,
    ) -> Result<TripDocument> {
        let (doc, ()) = self.store.update(tenant, |doc| {
            access::ensure_authorized(principal, doc)?;
            if checked {
                doc.group_progress.insert(item_key.to_string(), true);
            } else {
                doc.group_progress.remove(item_key);
            }
            Ok(())
        })?;
        Ok(doc)
    }
}
