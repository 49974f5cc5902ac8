use std::path::PathBuf;

use tabletop_dsl::problem_v1::parse_problem_v1;
use tabletop_dsl::NameSubstitution;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("canonicalize repo root")
}

fn catalog_pairs() -> Vec<(String, String)> {
    let raw = std::fs::read_to_string(repo_root().join("fixtures/catalog/objects.json"))
        .expect("read catalog");
    let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("catalog json");
    entries
        .iter()
        .map(|entry| {
            (
                entry["id"].as_str().expect("id").to_string(),
                entry["name"].as_str().expect("name").to_string(),
            )
        })
        .collect()
}

#[test]
fn annotated_problem_reads_with_names_and_back() {
    let subst = NameSubstitution::new(catalog_pairs()).expect("substitution");
    let text = std::fs::read_to_string(repo_root().join("fixtures/problems/46_0.pddl"))
        .expect("read problem");

    let named = subst.ids_to_names(&text);
    assert!(named.contains("(in red chili pepper_2 white bowl)"), "named={named}");
    assert!(named.contains("(closed white bowl)"), "named={named}");
    assert!(named.contains("(on stapler wooden block)"), "named={named}");
    assert!(!named.contains("kitchen_17"), "named={named}");

    assert_eq!(subst.names_to_ids(&named), text);
}

#[test]
fn substitution_after_parse_preserves_structure() {
    let subst = NameSubstitution::new(catalog_pairs()).expect("substitution");
    let text = std::fs::read_to_string(repo_root().join("fixtures/problems/46_0.pddl"))
        .expect("read problem");

    let roundtrip = subst.names_to_ids(&subst.ids_to_names(&text));
    assert_eq!(
        parse_problem_v1(&roundtrip).expect("parse"),
        parse_problem_v1(&text).expect("parse")
    );
}

#[test]
fn lid_names_do_not_collide_with_their_container() {
    // "white bowl lid" contains "white bowl"; the longer name must win.
    let subst = NameSubstitution::new(catalog_pairs()).expect("substitution");
    assert_eq!(
        subst.names_to_ids("(on white bowl lid white bowl)"),
        "(on lid_01 container_07)"
    );
}
