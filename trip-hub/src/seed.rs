//! Local seeding of a tenant document from a JSON file.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;
use trip_hub_core::{DocumentStore, TenantKey, TripDocument};

use crate::config::SeedArgs;

/// Write the document in `args.file` for `args.chat_id`. Existing documents
/// are only replaced with `--force`.
pub fn seed_tenant(args: &SeedArgs) -> Result<PathBuf> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;
    let doc = TripDocument::from_value(value)?;

    let store = DocumentStore::open(&args.data_dir)?;
    let tenant = TenantKey::resolve(&args.chat_id);
    if store.contains(&tenant)? && !args.force {
        bail!("a trip document for chat {} already exists; pass --force to overwrite", args.chat_id);
    }
    store.save_document(&tenant, &doc)?;

    let path = args.data_dir.join(tenant.file_name());
    info!(
        chat_id = %args.chat_id,
        trip = %doc.trip.name,
        days = doc.days.len(),
        refs = doc.refs.as_ref().map_or(0, Vec::len),
        checklist_categories = doc.group_checklist.len(),
        emergency_numbers = doc.emergency.len(),
        "seeded {}",
        path.display()
    );
    Ok(path)
}
