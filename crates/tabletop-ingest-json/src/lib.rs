//! JSON catalogs for tabletop problems
//!
//! Two inputs describe the physical object set:
//! - `objects.json`: one entry per catalog object (`id`, `name`, `category`,
//!   `quantity`);
//! - `scenes.json`: which catalog objects appear in each recorded scene.
//!
//! Catalogs feed the identifier ↔ name substitution and scene skeletons. They
//! never produce problem text on their own.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tabletop_dsl::problem_v1::ObjectType;
use tabletop_dsl::NameSubstitution;
use tracing::warn;

pub mod scenes;

pub use scenes::{scene_skeleton, Scene, SceneCatalog, SceneObject};

/// Map a raw category label to an object type.
///
/// Source spreadsheets use free-form labels ("bowl lid", "Container (ceramic)",
/// "kitchen"); anything that is neither a lid nor a container is an item.
pub fn category_from_raw(raw: &str) -> ObjectType {
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("lid") {
        ObjectType::Lid
    } else if lowered.contains("container") {
        ObjectType::Container
    } else {
        ObjectType::Item
    }
}

fn deserialize_category<'de, D>(deserializer: D) -> std::result::Result<ObjectType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(category_from_raw(&raw))
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_category")]
    pub category: ObjectType,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Object catalog in file order, indexed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    objects: Vec<CatalogObject>,
    by_id: HashMap<String, usize>,
}

impl ObjectCatalog {
    pub fn from_objects(objects: Vec<CatalogObject>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(objects.len());
        for (idx, object) in objects.iter().enumerate() {
            if object.id.trim().is_empty() {
                return Err(anyhow!("catalog entry {idx} has an empty id"));
            }
            if by_id.insert(object.id.clone(), idx).is_some() {
                return Err(anyhow!("duplicate catalog id `{}`", object.id));
            }
        }
        let catalog = ObjectCatalog { objects, by_id };
        catalog.warn_ambiguous_names();
        Ok(catalog)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let objects: Vec<CatalogObject> =
            serde_json::from_str(text).context("failed to parse object catalog JSON")?;
        Self::from_objects(objects)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read object catalog `{}`", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in `{}`", path.display()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogObject> {
        self.by_id.get(id).map(|&idx| &self.objects[idx])
    }

    pub fn object_type(&self, id: &str) -> Option<&ObjectType> {
        self.get(id).map(|object| &object.category)
    }

    /// `(id, name)` pairs in catalog order.
    pub fn id_to_name(&self) -> Vec<(String, String)> {
        self.objects
            .iter()
            .map(|object| (object.id.clone(), object.name.clone()))
            .collect()
    }

    /// Name → identifier. When several objects share a name the first one in
    /// catalog order is kept.
    pub fn name_to_id(&self) -> HashMap<String, String> {
        let mut out: HashMap<String, String> = HashMap::new();
        for object in &self.objects {
            out.entry(object.name.clone())
                .or_insert_with(|| object.id.clone());
        }
        out
    }

    /// `(name, kept id, ignored id)` for every object whose name was already
    /// taken by an earlier entry.
    pub fn ambiguous_names(&self) -> Vec<(&str, &str, &str)> {
        let mut first: HashMap<&str, &str> = HashMap::new();
        let mut out = Vec::new();
        for object in &self.objects {
            match first.get(object.name.as_str()) {
                Some(kept) => out.push((object.name.as_str(), *kept, object.id.as_str())),
                None => {
                    first.insert(object.name.as_str(), object.id.as_str());
                }
            }
        }
        out
    }

    fn warn_ambiguous_names(&self) {
        for (name, kept, ignored) in self.ambiguous_names() {
            warn!(
                name = %name,
                kept = %kept,
                ignored = %ignored,
                "catalog name is ambiguous; keeping the first id"
            );
        }
    }

    pub fn substitution(&self) -> Result<NameSubstitution> {
        NameSubstitution::new(self.id_to_name()).context("failed to build name substitution")
    }
}
