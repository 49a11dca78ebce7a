//! Tenant-scoped document store.
//!
//! Documents are created from a fixed template the first time a tenant is
//! seen and persisted immediately; afterwards they are loaded verbatim. Every
//! write replaces the whole document through the backend's atomic `put`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{AdminSet, EmergencyContact, TripDocument, TripInfo};
use crate::error::{Result, StoreError};
use crate::storage::{DocumentBackend, FileSystemBackend, MemoryBackend};
use crate::tenant::TenantKey;

const DEFAULT_TRIP_NAME: &str = "New Trip";

/// Blank template used when a tenant opens the app for the first time.
pub fn default_document() -> TripDocument {
    TripDocument {
        trip: TripInfo {
            name: DEFAULT_TRIP_NAME.to_string(),
            dates: Some(String::new()),
            extra: Default::default(),
        },
        days: Vec::new(),
        accoms: Vec::new(),
        weather: Vec::new(),
        links: Vec::new(),
        emergency: vec![EmergencyContact {
            name: "Emergency".to_string(),
            number: "112".to_string(),
            extra: Default::default(),
        }],
        group_checklist: Vec::new(),
        group_progress: Default::default(),
        wx_locations: Vec::new(),
        ref_cats: None,
        refs: None,
        admins: AdminSet::default(),
        extra: Default::default(),
    }
}

/// Key-scoped mutexes serializing load-mutate-save per tenant. A slot only
/// lives while some caller holds or waits on it, so the map stays bounded by
/// the number of tenants in flight.
#[derive(Default)]
pub struct TenantLocks {
    slots: Mutex<HashMap<TenantKey, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    /// Run `f` while holding the lock for `key`. Distinct keys never share a
    /// slot.
    pub fn with<T>(&self, key: &TenantKey, f: impl FnOnce() -> T) -> T {
        let slot = self.slot(key);
        let out = {
            let _guard = slot.lock();
            f()
        };
        drop(slot);
        self.prune(key);
        out
    }

    /// Number of slots currently allocated.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &TenantKey) -> Arc<Mutex<()>> {
        self.slots
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // New handles are only cloned under the map lock, so a count of one
    // here means nobody else holds or waits on the slot.
    fn prune(&self, key: &TenantKey) {
        let mut slots = self.slots.lock();
        if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(key);
        }
    }
}

pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    locks: TenantLocks,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            locks: TenantLocks::default(),
        }
    }

    /// Store backed by one JSON file per tenant under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Arc::new(FileSystemBackend::new(dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    pub fn locks(&self) -> &TenantLocks {
        &self.locks
    }

    /// Whether a document has ever been persisted for `key`.
    pub fn contains(&self, key: &TenantKey) -> Result<bool> {
        self.backend.exists(key)
    }

    /// Load the tenant's document, creating and persisting the default
    /// template if none exists yet.
    pub fn get_document(&self, key: &TenantKey) -> Result<TripDocument> {
        self.locks.with(key, || self.load_or_init(key))
    }

    /// Replace the tenant's document wholesale.
    pub fn save_document(&self, key: &TenantKey, doc: &TripDocument) -> Result<()> {
        self.locks.with(key, || self.write(key, doc))
    }

    /// Validate an untyped body and replace the tenant's document with it.
    /// On failure nothing is written.
    pub fn save_document_value(&self, key: &TenantKey, value: Value) -> Result<TripDocument> {
        let doc = TripDocument::from_value(value).inspect_err(|e| {
            warn!(tenant = %key, error = %e, "rejected document");
        })?;
        self.save_document(key, &doc)?;
        Ok(doc)
    }

    /// Run `f` against the current document and persist the result, holding
    /// the tenant's lock for the whole sequence. If `f` fails the stored
    /// document is untouched.
    pub fn update<T>(
        &self,
        key: &TenantKey,
        f: impl FnOnce(&mut TripDocument) -> Result<T>,
    ) -> Result<(TripDocument, T)> {
        self.locks.with(key, || {
            let mut doc = self.load_or_init(key)?;
            let out = f(&mut doc)?;
            self.write(key, &doc)?;
            Ok((doc, out))
        })
    }

    fn load_or_init(&self, key: &TenantKey) -> Result<TripDocument> {
        match self.backend.get(key)? {
            Some(bytes) => decode(key, &bytes),
            None => {
                let doc = default_document();
                self.write(key, &doc)?;
                info!(tenant = %key, "created trip document from default template");
                Ok(doc)
            }
        }
    }

    fn write(&self, key: &TenantKey, doc: &TripDocument) -> Result<()> {
        doc.validate()?;
        let bytes = encode(doc)?;
        self.backend.put(key, &bytes)?;
        debug!(tenant = %key, days = doc.days.len(), "document saved");
        Ok(())
    }
}

fn decode(key: &TenantKey, bytes: &[u8]) -> Result<TripDocument> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::storage(format!("corrupt document for tenant {key}: {e}")))
}

/// Pretty JSON, two-space indent, non-ASCII text written literally.
fn encode(doc: &TripDocument) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::storage(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Accommodation, Day, Stop};
    use serde_json::json;

    fn stop(name: &str) -> Stop {
        Stop {
            time: "09:00".into(),
            name: name.into(),
            note: None,
            maps_url: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn first_access_persists_default_template() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");
        assert!(!store.contains(&key).unwrap());

        let first = store.get_document(&key).unwrap();
        assert_eq!(first, default_document());
        assert!(store.contains(&key).unwrap());

        let second = store.get_document(&key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn default_template_shape() {
        let value = default_document().to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "trip": {"name": "New Trip", "dates": ""},
                "days": [],
                "accoms": [],
                "weather": [],
                "links": [],
                "emergency": [{"name": "Emergency", "number": "112"}],
                "groupChecklist": [],
                "groupProgress": {},
                "wxLocations": [],
                "admins": []
            })
        );
    }

    #[test]
    fn existing_document_is_never_reset() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");
        let mut doc = store.get_document(&key).unwrap();
        doc.trip.name = "Morocco".into();
        store.save_document(&key, &doc).unwrap();

        assert_eq!(store.get_document(&key).unwrap().trip.name, "Morocco");
    }

    #[test]
    fn invalid_save_leaves_previous_document() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");
        let mut doc = store.get_document(&key).unwrap();
        doc.trip.name = "Picos".into();
        store.save_document(&key, &doc).unwrap();

        let err = store.save_document_value(&key, json!({})).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.get_document(&key).unwrap(), doc);
    }

    #[test]
    fn round_trip_preserves_non_ascii_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let key = TenantKey::resolve(-5046151729i64);

        let mut doc = default_document();
        doc.trip.name = "Marrakech — مراكش".into();
        doc.days.push(Day {
            id: "sat".into(),
            label: "Sáb 28 Feb".into(),
            title: "Lagos de Covadonga".into(),
            emoji: Some("🏔".into()),
            date: Some("2026-02-28".into()),
            description: None,
            stops: vec![stop("Café à Cangas de Onís")],
            extra: Default::default(),
        });
        store.save_document(&key, &doc).unwrap();
        assert_eq!(store.get_document(&key).unwrap(), doc);

        let raw = std::fs::read_to_string(dir.path().join(key.file_name())).unwrap();
        assert!(raw.contains("مراكش"));
        assert!(raw.contains("Café à Cangas de Onís"));
        assert!(raw.contains("\n  \"trip\": {"));
    }

    /// Memory backend whose writes can be switched off.
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_puts: std::sync::atomic::AtomicBool,
    }

    impl DocumentBackend for FlakyBackend {
        fn get(&self, key: &TenantKey) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &TenantKey, data: &[u8]) -> Result<()> {
            if self.fail_puts.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::storage("disk full"));
            }
            self.inner.put(key, data)
        }
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let backend = Arc::new(FlakyBackend::default());
        let store = DocumentStore::new(backend.clone());
        let key = TenantKey::resolve("g1");
        let before = store.get_document(&key).unwrap();

        backend
            .fail_puts
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let mut changed = before.clone();
        changed.trip.name = "Morocco".into();
        let err = store.save_document(&key, &changed).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));

        let err = store
            .update(&key, |doc| {
                doc.trip.name = "Morocco".into();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.get_document(&key).unwrap(), before);
    }

    #[test]
    fn corrupt_document_is_a_storage_error() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");
        store.backend().put(&key, b"{ not json").unwrap();

        let err = store.get_document(&key).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.backend().get(&key).unwrap().unwrap(), b"{ not json");
    }

    #[test]
    fn failed_update_does_not_persist() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");
        let before = store.get_document(&key).unwrap();

        let result: Result<(TripDocument, ())> = store.update(&key, |doc| {
            doc.trip.name = "half-applied".into();
            Err(StoreError::not_found("day `x`"))
        });
        assert!(result.is_err());
        assert_eq!(store.get_document(&key).unwrap(), before);
    }

    #[test]
    fn concurrent_updates_on_one_tenant_are_serialized() {
        let store = DocumentStore::in_memory();
        let key = TenantKey::resolve("g1");

        std::thread::scope(|s| {
            for i in 0..8 {
                let store = &store;
                let key = &key;
                s.spawn(move || {
                    store
                        .update(key, |doc| {
                            doc.accoms.push(Accommodation {
                                name: format!("Hotel {i}"),
                                url: "http://x".into(),
                                day: None,
                                notes: None,
                                checkin: None,
                                checkin_time: None,
                                checkout: None,
                                checkout_time: None,
                                maps_url: None,
                                extra: Default::default(),
                            });
                            Ok(())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(store.get_document(&key).unwrap().accoms.len(), 8);
        assert!(store.locks().is_empty());
    }

    #[test]
    fn lock_slots_are_released_after_use() {
        let store = DocumentStore::in_memory();
        for chat in ["a", "b", "c"] {
            store.get_document(&TenantKey::resolve(chat)).unwrap();
        }
        assert_eq!(store.locks().len(), 0);

        let key = TenantKey::resolve("a");
        store
            .update(&key, |_| {
                assert_eq!(store.locks().len(), 1);
                Ok(())
            })
            .unwrap();
        assert!(store.locks().is_empty());
    }

    #[test]
    fn tenants_are_isolated() {
        let store = DocumentStore::in_memory();
        let a = TenantKey::resolve("a");
        let b = TenantKey::resolve("b");
        store
            .update(&a, |doc| {
                doc.trip.name = "A trip".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(store.get_document(&b).unwrap().trip.name, DEFAULT_TRIP_NAME);
    }
}
