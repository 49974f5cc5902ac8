//! Integration tests for the complete tabletop pipeline
//!
//! These tests exercise the crates together:
//! - catalog → identifier/name substitution
//! - problem text → parse → inference → verification → canonical text
//! - scene catalog → skeleton → compiled problem
//!
//! Run with: cargo test --test integration_tests

use std::path::PathBuf;

use tabletop_dsl::digest::problem_digest_v1;
use tabletop_dsl::problem_v1::{Fact, ObjectType};
use tabletop_dsl::{
    compile_problem_v1, finalize_problem_v1, parse_problem_v1, LidTable, ParseOptions,
};
use tabletop_ingest_json::{scene_skeleton, ObjectCatalog, SceneCatalog};
use tempfile::tempdir;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn fixture(path: &str) -> PathBuf {
    repo_root().join("fixtures").join(path)
}

fn lid_table() -> LidTable {
    let text = std::fs::read_to_string(fixture("catalog/lids.json")).expect("read lids");
    serde_json::from_str(&text).expect("lid table json")
}

// ============================================================================
// Problem pipeline
// ============================================================================

#[test]
fn test_fixture_lid_table_matches_builtin() {
    assert_eq!(lid_table(), LidTable::builtin());
}

#[test]
fn test_named_problem_compiles_after_substitution() {
    let catalog = ObjectCatalog::from_path(&fixture("catalog/objects.json")).expect("catalog");
    let subst = catalog.substitution().expect("substitution");

    // Annotators sometimes hand back problems written with names.
    let annotated = std::fs::read_to_string(fixture("problems/46_0.pddl")).expect("read");
    let named = subst.ids_to_names(&annotated);
    assert!(named.contains("(closed white bowl)"));

    let restored = subst.names_to_ids(&named);
    let compiled =
        compile_problem_v1(&restored, ParseOptions::default(), &lid_table()).expect("compile");

    assert!(compiled
        .problem
        .init
        .contains(&Fact::binary("on", "lid_01", "container_07")));
    assert_eq!(
        compiled.problem.object_type("tool_05"),
        Some(&ObjectType::Item)
    );
    assert!(!compiled.inferred.is_empty());
}

#[test]
fn test_canonical_output_is_stable() {
    let lids = lid_table();
    let text = std::fs::read_to_string(fixture("problems/46_0.pddl")).expect("read");
    let first = compile_problem_v1(&text, ParseOptions::default(), &lids).expect("compile");
    let second = compile_problem_v1(&first.text, ParseOptions::default(), &lids).expect("recompile");

    assert_eq!(first.text, second.text);
    assert!(second.inferred.is_empty());
    assert_eq!(problem_digest_v1(&first.text), problem_digest_v1(&second.text));
}

#[test]
fn test_canonical_output_survives_disk_roundtrip() {
    let dir = tempdir().expect("tempdir");
    let text = std::fs::read_to_string(fixture("problems/46_0.pddl")).expect("read");
    let compiled =
        compile_problem_v1(&text, ParseOptions::default(), &lid_table()).expect("compile");

    let path = dir.path().join("46_0.pddl");
    std::fs::write(&path, &compiled.text).expect("write");
    let reread = parse_problem_v1(&std::fs::read_to_string(&path).expect("reread")).expect("parse");
    assert_eq!(reread, compiled.problem);
}

// ============================================================================
// Scene catalog → skeleton
// ============================================================================

#[test]
fn test_every_scene_skeleton_verifies() {
    let objects = ObjectCatalog::from_path(&fixture("catalog/objects.json")).expect("objects");
    let scenes = SceneCatalog::from_path(&fixture("catalog/scenes.json")).expect("scenes");
    let lids = lid_table();

    for scene in scenes.iter() {
        let skeleton = scene_skeleton(scene, &objects, "manip").expect("skeleton");
        assert_eq!(skeleton.objects.len(), scene.obj_ids.len());

        let compiled = finalize_problem_v1(skeleton, &lids)
            .unwrap_or_else(|e| panic!("scene {}: {e}", scene.scene_id));
        assert_eq!(compiled.problem.init.with_predicate("handempty").count(), 1);
        for id in compiled.problem.objects.keys() {
            assert!(
                compiled.problem.init.contains(&Fact::unary("ontable", id.as_str())),
                "scene {}: {id} not on the table",
                scene.scene_id
            );
        }
    }
}
