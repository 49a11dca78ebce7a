//! Typed trip document persisted once per tenant.
//!
//! Field names follow the JSON layout the web app and the offline scripts
//! already read and write (camelCase). Every record keeps unknown keys in a
//! flattened `extra` map so newer clients can add fields without the store
//! dropping them on the next save. Optional scalars stay `None` when absent,
//! so a stored document reads back with the keys it was written with.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{Result, StoreError};

/// Unrecognised keys carried through a load/save round trip.
pub type Extra = Map<String, Value>;

/// A user identity as supplied by the chat transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PrincipalId {
    fn from(id: i64) -> Self {
        PrincipalId(id)
    }
}

/// Set of admin principals, stored as a JSON array in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdminSet(Vec<PrincipalId>);

impl AdminSet {
    /// Insert `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: PrincipalId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn contains(&self, id: PrincipalId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PrincipalId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PrincipalId> for AdminSet {
    fn from_iter<I: IntoIterator<Item = PrincipalId>>(iter: I) -> Self {
        let mut set = AdminSet::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'de> Deserialize<'de> for AdminSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ids = Vec::<PrincipalId>::deserialize(deserializer)?;
        Ok(ids.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub label: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One itinerary entry. `time` is a display string and is never parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub time: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Link to an external forecast page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastLink {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Location rendered by the in-app weather widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastLocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Useful link grouped by `category` for display. Older documents spell the
/// key `cat`; it is accepted on input and always written back as `category`.
/// When both keys are present `category` wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LinkRecord")]
pub struct Link {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Deserialize)]
struct LinkRecord {
    name: String,
    url: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    cat: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(flatten)]
    extra: Extra,
}

impl From<LinkRecord> for Link {
    fn from(raw: LinkRecord) -> Self {
        Link {
            name: raw.name,
            url: raw.url,
            category: raw.category.or(raw.cat),
            notes: raw.notes,
            extra: raw.extra,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefCategory {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Entry on the info tab: either a link (`name`/`url`) or a note
/// (`title`/`content`) filed under a [`RefCategory`] via `catId`. A legacy
/// `cat` key is folded into `category` the same way as for [`Link`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ReferenceRecord")]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cat_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    cat: Option<String>,
    #[serde(default)]
    cat_id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(flatten)]
    extra: Extra,
}

impl From<ReferenceRecord> for Reference {
    fn from(raw: ReferenceRecord) -> Self {
        Reference {
            id: raw.id,
            name: raw.name,
            url: raw.url,
            category: raw.category.or(raw.cat),
            cat_id: raw.cat_id,
            kind: raw.kind,
            title: raw.title,
            content: raw.content,
            notes: raw.notes,
            extra: raw.extra,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub number: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The full trip record for one tenant.
///
/// `trip` and `days` are mandatory; every other collection defaults to empty
/// when absent. `refCats` and `refs` are only written when the stored document
/// had them or something was added, so the blank template keeps its
/// historical shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDocument {
    pub trip: TripInfo,
    pub days: Vec<Day>,
    #[serde(default)]
    pub accoms: Vec<Accommodation>,
    #[serde(default)]
    pub weather: Vec<ForecastLink>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub emergency: Vec<EmergencyContact>,
    #[serde(default)]
    pub group_checklist: Vec<ChecklistCategory>,
    #[serde(default)]
    pub group_progress: BTreeMap<String, bool>,
    #[serde(default)]
    pub wx_locations: Vec<ForecastLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_cats: Option<Vec<RefCategory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<Reference>>,
    #[serde(default)]
    pub admins: AdminSet,
    #[serde(flatten)]
    pub extra: Extra,
}

impl TripDocument {
    /// Parse an untyped body (HTTP payload, script upload) into a document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(StoreError::validation("document must be a JSON object"));
        };
        for required in ["trip", "days"] {
            if !object.contains_key(required) {
                return Err(StoreError::validation(format!(
                    "missing required field `{required}`"
                )));
            }
        }
        let doc: TripDocument =
            serde_json::from_value(value).map_err(|e| StoreError::validation(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| StoreError::storage(e.to_string()))
    }

    /// Structural checks beyond what the type already guarantees.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.days.len());
        for day in &self.days {
            if !seen.insert(day.id.as_str()) {
                return Err(StoreError::validation(format!(
                    "duplicate day id `{}`",
                    day.id
                )));
            }
        }
        Ok(())
    }

    pub fn day(&self, id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == id)
    }

    pub fn day_mut(&mut self, id: &str) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.id == id)
    }

    pub fn checklist_category_mut(&mut self, id: &str) -> Option<&mut ChecklistCategory> {
        self.group_checklist.iter_mut().find(|c| c.id == id)
    }
}
