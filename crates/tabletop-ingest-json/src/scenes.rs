//! Scene catalog and problem skeletons.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tabletop_dsl::problem_v1::{ObjectType, Problem};

use crate::{category_from_raw, ObjectCatalog};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: u32,
    pub obj_ids: Vec<String>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub quantity: u32,
}

impl Scene {
    /// Object names in `obj_ids` order, duplicates repeated.
    ///
    /// Identifiers missing from the catalog are returned unchanged.
    pub fn object_names(&self, catalog: &ObjectCatalog) -> Vec<String> {
        self.obj_ids
            .iter()
            .map(|id| catalog.get(id).map_or_else(|| id.clone(), |o| o.name.clone()))
            .collect()
    }

    /// One problem identifier per `obj_ids` entry.
    ///
    /// Identifiers that occur more than once are numbered `_1`, `_2`, ... in
    /// order of appearance; unique identifiers are kept as is.
    pub fn instance_ids(&self) -> Vec<(String, String)> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for id in &self.obj_ids {
            *totals.entry(id.as_str()).or_insert(0) += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.obj_ids
            .iter()
            .map(|id| {
                let total = totals.get(id.as_str()).copied().unwrap_or(1);
                if total == 1 {
                    return (id.clone(), id.clone());
                }
                let n = seen.entry(id.as_str()).or_insert(0);
                *n += 1;
                (id.clone(), format!("{id}_{n}"))
            })
            .collect()
    }

    fn embedded_type(&self, id: &str) -> Option<ObjectType> {
        self.objects
            .iter()
            .find(|object| object.id == id && !object.category.is_empty())
            .map(|object| category_from_raw(&object.category))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    scenes: Vec<Scene>,
}

impl SceneCatalog {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let scenes: Vec<Scene> =
            serde_json::from_str(text).context("failed to parse scene catalog JSON")?;
        Ok(SceneCatalog { scenes })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene catalog `{}`", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in `{}`", path.display()))
    }

    pub fn get(&self, scene_id: u32) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.scene_id == scene_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Objects-only problem for a scene (`scene_<id>`), with an empty init.
///
/// Types come from the object catalog, falling back to the category embedded
/// in the scene entry.
pub fn scene_skeleton(scene: &Scene, catalog: &ObjectCatalog, domain: &str) -> Result<Problem> {
    let mut problem = Problem::new(format!("scene_{:02}", scene.scene_id), domain);
    for (catalog_id, instance_id) in scene.instance_ids() {
        let ty = catalog
            .object_type(&catalog_id)
            .cloned()
            .or_else(|| scene.embedded_type(&catalog_id))
            .ok_or_else(|| {
                anyhow!(
                    "scene {} references `{catalog_id}`, which is not in the object catalog",
                    scene.scene_id
                )
            })?;
        problem.declare(instance_id, ty);
    }
    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(ids: &[&str]) -> Scene {
        Scene {
            scene_id: 3,
            obj_ids: ids.iter().map(|s| s.to_string()).collect(),
            objects: Vec::new(),
            category: Vec::new(),
            quantity: ids.len() as u32,
        }
    }

    #[test]
    fn duplicate_ids_are_numbered_in_order() {
        let ids = scene(&["a", "b", "a", "c", "a"]).instance_ids();
        let instances: Vec<&str> = ids.iter().map(|(_, i)| i.as_str()).collect();
        assert_eq!(instances, vec!["a_1", "b", "a_2", "c", "a_3"]);
        assert!(ids.iter().all(|(c, i)| i.starts_with(c.as_str())));
    }

    #[test]
    fn skeleton_uses_embedded_category_when_catalog_misses() {
        let catalog = ObjectCatalog::default();
        let mut s = scene(&["bowl"]);
        s.objects.push(SceneObject {
            id: "bowl".to_string(),
            name: "bowl".to_string(),
            category: "container".to_string(),
        });
        let problem = scene_skeleton(&s, &catalog, "manip").expect("skeleton");
        assert_eq!(problem.name, "scene_03");
        assert_eq!(problem.object_type("bowl"), Some(&ObjectType::Container));
        assert!(problem.init.is_empty());
    }

    #[test]
    fn skeleton_fails_for_unknown_objects() {
        let err = scene_skeleton(&scene(&["ghost"]), &ObjectCatalog::default(), "manip")
            .expect_err("unknown");
        assert!(err.to_string().contains("`ghost`"), "err={err}");
    }
}
