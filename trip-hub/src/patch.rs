//! Remote maintenance: fetch a tenant's document over HTTP, replace one
//! top-level field and save it back. Documents are never built from scratch;
//! the fetched copy keeps every field the patch does not touch.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing::info;
use trip_hub_core::TripDocument;

use crate::config::PatchArgs;

const PROGRESS_FIELD: &str = "groupProgress";
const CHECKLIST_FIELD: &str = "groupChecklist";

pub struct PatchClient {
    base_url: String,
    client: reqwest::Client,
}

impl PatchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn data_url(&self) -> String {
        format!("{}/api/data", self.base_url)
    }

    pub async fn fetch(&self, chat_id: &str) -> Result<Value> {
        let resp = self
            .client
            .get(self.data_url())
            .query(&[("chat_id", chat_id)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn save(&self, chat_id: &str, doc: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(self.data_url())
            .query(&[("chat_id", chat_id)])
            .json(doc)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Fetch, replace `field` with `value`, validate locally, save.
    pub async fn patch_field(&self, chat_id: &str, field: &str, value: Value) -> Result<Value> {
        info!(%chat_id, "fetching current data");
        let mut doc = self.fetch(chat_id).await?;
        apply_field_patch(&mut doc, field, value)?;
        TripDocument::from_value(doc.clone()).context("patched document failed validation")?;
        info!(%chat_id, %field, "saving");
        self.save(chat_id, &doc).await
    }
}

/// Replace one top-level field in place. Replacing the checklist also clears
/// any ticks recorded against the old items.
pub fn apply_field_patch(doc: &mut Value, field: &str, value: Value) -> Result<()> {
    if field.is_empty() {
        bail!("field name must not be empty");
    }
    let object = doc
        .as_object_mut()
        .ok_or_else(|| anyhow!("remote document is not a JSON object"))?;
    object.insert(field.to_string(), value);
    if field == CHECKLIST_FIELD {
        object.insert(PROGRESS_FIELD.to_string(), Value::Object(Default::default()));
    }
    Ok(())
}

pub async fn run(args: PatchArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;
    let count = value.as_array().map(Vec::len);

    let client = PatchClient::new(args.base_url);
    let result = client.patch_field(&args.chat_id, &args.field, value).await?;
    info!(field = %args.field, items = ?count, %result, "patch applied");
    Ok(())
}
