//! Resolves which Notion collection a sync run writes into, creating the
//! database on first use when allowed and adding missing properties to a
//! configured one.
//!
//! Callers keep the resolved target for the lifetime of their syncer; this
//! module holds no state.

use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use super::{CollectionTarget, NotionError, NotionService};
use crate::config;
use crate::error::SyncError;
use crate::sync::properties::PropertyNames;

pub const DATABASE_TITLE: &str = "Steam Game Library";

#[instrument(skip_all)]
pub async fn resolve_target(
    notion: &dyn NotionService,
    settings: &config::Notion,
) -> Result<CollectionTarget, SyncError> {
    if settings.token.trim().is_empty() {
        return Err(SyncError::Configuration(
            "notion.token is missing (set NOTION_API_KEY)".into(),
        ));
    }

    let database_id = settings.database_id.trim();
    let data_source_id = settings.data_source_id.trim();

    if !database_id.is_empty() && !data_source_id.is_empty() {
        let target = CollectionTarget::new(database_id, Some(data_source_id.to_string()));
        ensure_schema(notion, &target, &settings.fields).await?;
        return Ok(target);
    }

    if !database_id.is_empty() {
        let db = notion.retrieve_database(database_id).await?;
        let target = match db.first_data_source() {
            Some(ds) => {
                info!(
                    data_source_id = ds,
                    "resolved data source from database; pin it as notion.data_source_id"
                );
                CollectionTarget::new(database_id, Some(ds.to_string()))
            }
            None => {
                warn!(database_id, "database lists no data source; writing by database id");
                CollectionTarget::new(database_id, None)
            }
        };
        ensure_schema(notion, &target, &settings.fields).await?;
        return Ok(target);
    }

    let root_page_id = settings.root_page_id.trim();
    if root_page_id.is_empty() {
        return Err(SyncError::Configuration(
            "notion.database_id is missing and no notion.root_page_id was given to create one"
                .into(),
        ));
    }
    if !settings.auto_provision {
        return Err(SyncError::Configuration(
            "notion.auto_provision is disabled; create the database and set notion.database_id"
                .into(),
        ));
    }

    let db = notion
        .create_database(root_page_id, DATABASE_TITLE, database_schema(&settings.fields))
        .await?;
    let target = CollectionTarget::new(db.id.clone(), db.first_data_source().map(str::to_string));
    info!(
        database_id = %target.database_id,
        data_source_id = ?target.data_source_id,
        "created Notion database; add these ids to the config to reuse it"
    );
    Ok(target)
}

/// Add the properties of [`database_schema`] that `target` lacks and return
/// their names. The title property is never added since every collection
/// already has one; a differently named title is only reported.
#[instrument(skip_all)]
pub async fn ensure_schema(
    notion: &dyn NotionService,
    target: &CollectionTarget,
    fields: &PropertyNames,
) -> Result<Vec<String>, NotionError> {
    let current = notion.retrieve_schema(target).await?;
    if current.properties.is_empty() {
        warn!(database_id = %target.database_id, "collection exposes no property schema; skipping schema check");
        return Ok(Vec::new());
    }

    let Value::Object(wanted) = database_schema(fields) else {
        return Ok(Vec::new());
    };
    let mut missing = Map::new();
    for (name, definition) in wanted {
        match current.properties.get(&name) {
            Some(prop) if definition.get(prop.typ.as_str()).is_none() => {
                warn!(property = %name, found = %prop.typ, "Notion property has an unexpected type");
            }
            Some(_) => {}
            None if name == fields.title => {
                warn!(property = %name, "title property not found; rename it in Notion or set notion.fields.title");
            }
            None => {
                missing.insert(name, definition);
            }
        }
    }

    if missing.is_empty() {
        return Ok(Vec::new());
    }
    let added: Vec<String> = missing.keys().cloned().collect();
    info!(properties = ?added, "adding missing properties to Notion collection");
    notion.update_schema(target, Value::Object(missing)).await?;
    Ok(added)
}

/// Property schema for a freshly created database.
pub fn database_schema(fields: &PropertyNames) -> Value {
    let mut props = Map::new();
    props.insert(fields.title.clone(), json!({ "title": {} }));
    props.insert(fields.app_id.clone(), json!({ "number": {} }));
    props.insert(fields.playtime.clone(), json!({ "number": {} }));
    props.insert(fields.last_played.clone(), json!({ "date": {} }));
    props.insert(fields.store_link.clone(), json!({ "url": {} }));
    props.insert(fields.synced_at.clone(), json!({ "date": {} }));
    Value::Object(props)
}
