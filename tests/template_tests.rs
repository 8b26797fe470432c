//! Template pipeline tests over an in-memory tree

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {

use graftset::error::exit_code_for;
use graftset::system::{MemorySystem, System};
use graftset::template::{TemplateError, TemplateService, TemplateValues, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn project() -> MemorySystem {
    MemorySystem::new()
        .with_file(
            "/proj/main.tf.template",
            b"name = \"{{ .Name }}\"\nregion = \"{{ .Cloud.Region }}\"\n",
        )
        .with_file("/proj/README.md.template", b"# {{- .Name -}}\n")
        .with_file("/proj/.git/HEAD.template", b"{{ .Ignored }}")
        .with_file("/proj/static.txt", b"{{ .Untouched }}")
}

fn values(yaml: &str) -> TemplateValues {
    TemplateValues::from_yaml_str(yaml).unwrap()
}

fn prepared(system: &MemorySystem) -> TemplateService<'_> {
    let mut service = TemplateService::new(system);
    service.discover(Path::new("/proj")).unwrap();
    service.parse_all().unwrap();
    service.build_requirement_skeleton().unwrap();
    service
}

#[test]
fn discovery_skips_vcs_and_plain_files() {
    let system = project();
    let mut service = TemplateService::new(&system);
    let found = service.discover(Path::new("/proj")).unwrap().to_vec();
    assert_eq!(
        found,
        vec![
            PathBuf::from("/proj/README.md.template"),
            PathBuf::from("/proj/main.tf.template"),
        ]
    );
}

#[test]
fn skeleton_holds_every_key_once() {
    let system = project();
    let service = prepared(&system);
    let flat = service.skeleton().flatten();
    let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Cloud.Region", "Name"]);
}

#[test]
fn render_and_finalize_with_complete_values() {
    let system = project();
    let mut service = prepared(&system);
    service.populate_from_document(values("Name: demo\nCloud:\n  Region: westeurope\n"));
    service.execute_all(true).unwrap();
    let finalized = service.finalize().unwrap();

    assert_eq!(finalized.len(), 2);
    assert_eq!(
        system.read_to_string(Path::new("/proj/main.tf")).unwrap(),
        "name = \"demo\"\nregion = \"westeurope\"\n"
    );
    assert_eq!(
        system.read_to_string(Path::new("/proj/README.md")).unwrap(),
        "#demo"
    );
    assert!(!system.exists(Path::new("/proj/main.tf.template")));
    assert_eq!(
        system.read_to_string(Path::new("/proj/static.txt")).unwrap(),
        "{{ .Untouched }}"
    );
}

#[test]
fn fail_on_missing_checks_before_writing() {
    let system = project();
    let mut service = prepared(&system);
    service.populate_from_document(values("Name: demo\n"));

    let err = service.execute_all(true).unwrap_err();
    match err {
        TemplateError::MissingValues { ref keys } => assert_eq!(keys, &vec!["Cloud.Region".to_owned()]),
        ref other => panic!("unexpected error: {other}"),
    }
    assert_eq!(exit_code_for(&anyhow::Error::from(err)), 4);

    // Nothing was rendered
    assert_eq!(
        system
            .read_to_string(Path::new("/proj/README.md.template"))
            .unwrap(),
        "# {{- .Name -}}\n"
    );
}

#[test]
fn lenient_mode_fails_on_the_template_needing_the_key() {
    let system = project();
    let mut service = prepared(&system);
    service.populate_from_document(values("Name: demo\n"));

    let err = service.execute_all(false).unwrap_err();
    match err {
        TemplateError::MissingValue { ref path, ref key } => {
            assert_eq!(path, Path::new("/proj/main.tf.template"));
            // The lookup stops at the first absent segment
            assert_eq!(key, "Cloud");
        }
        ref other => panic!("unexpected error: {other}"),
    }

    // Templates are rendered in path order, so the README went first
    assert_eq!(
        system
            .read_to_string(Path::new("/proj/README.md.template"))
            .unwrap(),
        "#demo"
    );
}

#[test]
fn defaults_fill_required_leaves_only() {
    let system = project();
    let mut service = prepared(&system);
    let defaults: BTreeMap<String, String> = [
        ("Cloud.Region".to_owned(), "northeurope".to_owned()),
        ("Unused".to_owned(), "x".to_owned()),
    ]
    .into_iter()
    .collect();

    assert_eq!(service.apply_defaults(&defaults), 1);
    let flat = service.skeleton().flatten();
    assert_eq!(flat.get("Cloud.Region").map(String::as_str), Some("northeurope"));
    assert!(!flat.contains_key("Unused"));
}

#[test]
fn unsupported_constructs_are_batched() {
    let system = MemorySystem::new()
        .with_file("/proj/a.template", b"{{ if .Flag }}x{{ end }}{{ .Name }}")
        .with_file("/proj/b.template", b"{{ range .Items }}{{ . }}{{ end }}");
    let mut service = TemplateService::new(&system);
    service.discover(Path::new("/proj")).unwrap();
    service.parse_all().unwrap();

    let err = service.build_requirement_skeleton().unwrap_err();
    match err {
        TemplateError::UnsupportedConstructs { ref errors } => assert_eq!(errors.len(), 2),
        ref other => panic!("unexpected error: {other}"),
    }
    // Accepted keys survive the batch error
    assert!(service.skeleton().get("Name").is_some());
}

#[test]
fn syntax_errors_name_the_file() {
    let system = MemorySystem::new().with_file("/proj/bad.template", b"{{ .Name ");
    let mut service = TemplateService::new(&system);
    service.discover(Path::new("/proj")).unwrap();

    let err = service.parse_all().unwrap_err();
    assert!(matches!(err, TemplateError::Parse { .. }));
    assert!(err.to_string().contains("bad.template"));
}

#[test]
fn empty_nested_map_in_values_file_is_rejected() {
    let err = TemplateValues::from_yaml_str("Cloud: {}\nName: demo\n").unwrap_err();
    assert!(err.to_string().contains("'Cloud' is an empty mapping"));
}

#[test]
fn missing_root_is_reported() {
    let system = MemorySystem::new();
    let mut service = TemplateService::new(&system);
    let err = service.discover(Path::new("/nowhere")).unwrap_err();
    assert!(matches!(err, TemplateError::RootNotFound { .. }));
}

fn to_values(map: BTreeMap<String, Value>) -> TemplateValues {
    let mut values = TemplateValues::new();
    for (key, value) in map {
        values.insert(key, value);
    }
    values
}

/// Nested maps of string leaves, empty ones included; keys never contain
/// the separator
fn values_strategy() -> impl Strategy<Value = TemplateValues> {
    let leaf = "[a-z]{0,8}".prop_map(Value::Leaf);
    let value = leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
            .prop_map(|map| Value::Node(to_values(map)))
    });
    prop::collection::btree_map("[A-Za-z]{1,6}", value, 1..5).prop_map(to_values)
}

proptest! {
    #[test]
    fn flatten_then_rebuild_keeps_shape(values in values_strategy()) {
        let rebuilt = TemplateValues::rebuild(&values.flatten());
        prop_assert_eq!(&rebuilt, &values);
        prop_assert!(values.missing_keys(&rebuilt).is_empty());
    }

    #[test]
    fn yaml_round_trip_keeps_values(values in values_strategy()) {
        let yaml = values.to_yaml_string().unwrap();
        let parsed = TemplateValues::from_yaml_str(&yaml).unwrap();
        prop_assert_eq!(parsed, values);
    }
}

}
