//! Source resolution tests

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {

use graftset::config::yaml::parse_source_config;
use graftset::config::{ResolutionError, Selection, SourceConfig};
use graftset::error::exit_code_for;
use graftset::sources::SourceService;
use graftset::system::MemorySystem;
use std::collections::BTreeSet;
use std::sync::Arc;

const CONFIG: &str = r#"
sourceAuths:
  - authAlias: ado
    userName: builder
    pat: from-file
  - authAlias: gh-main
    userName: octo
sources:
  - alias: base
    sourceType: git
    url: https://dev.azure.com/org/project/_git/base
    path: /
    sourceAuthAlias: ado
  - alias: ci
    sourceType: git
    url: https://github.com/org/ci.git
    path: /pipelines
    sourceAuthAlias: gh-main
  - alias: docs
    sourceType: file
    path: /
  - alias: orphan
    sourceType: git
    url: https://github.com/org/orphan.git
    path: /
    sourceAuthAlias: nobody
sourceSets:
  - alias: service
    sources: [base, ci]
    values:
      Cloud.Region: westeurope
  - alias: broken
    sources: [base, missing]
"#;

fn config() -> SourceConfig {
    parse_source_config(CONFIG).unwrap()
}

fn service(system: MemorySystem) -> SourceService {
    SourceService::new(Arc::new(system))
}

fn aliases(service: &SourceService) -> BTreeSet<String> {
    service
        .targets()
        .iter()
        .map(|t| t.target().alias().to_owned())
        .collect()
}

#[test]
fn source_set_resolves_to_its_members() {
    let mut service = service(MemorySystem::new());
    service
        .resolve(&config(), &Selection::SourceSet("service".to_owned()))
        .unwrap();

    let expected: BTreeSet<String> = ["base", "ci"].iter().map(|s| (*s).to_owned()).collect();
    assert_eq!(aliases(&service), expected);
    assert_eq!(
        service.defaults().get("Cloud.Region").map(String::as_str),
        Some("westeurope")
    );
}

#[test]
fn explicit_sources_carry_no_defaults() {
    let mut service = service(MemorySystem::new());
    service
        .resolve(
            &config(),
            &Selection::Sources(vec!["ci".to_owned(), "docs".to_owned()]),
        )
        .unwrap();

    assert_eq!(service.targets().len(), 2);
    assert!(service.defaults().is_empty());
}

#[test]
fn bound_auth_matches_source() {
    let mut service = service(MemorySystem::new());
    let targets = service
        .resolve(&config(), &Selection::Sources(vec!["base".to_owned(), "docs".to_owned()]))
        .unwrap();

    let base = targets.iter().find(|t| t.target().alias() == "base").unwrap();
    assert_eq!(base.target().auth.as_ref().unwrap().auth_alias, "ado");
    assert_eq!(base.target().auth.as_ref().unwrap().pat.as_deref(), Some("from-file"));

    let docs = targets.iter().find(|t| t.target().alias() == "docs").unwrap();
    assert!(docs.target().auth.is_none());
}

#[test]
fn duplicate_aliases_resolve_once() {
    let mut service = service(MemorySystem::new());
    service
        .resolve(
            &config(),
            &Selection::Sources(vec!["ci".to_owned(), "ci".to_owned(), "base".to_owned()]),
        )
        .unwrap();
    assert_eq!(service.targets().len(), 2);
}

#[test]
fn unknown_source_set_is_reported() {
    let mut service = service(MemorySystem::new());
    let err = service
        .resolve(&config(), &Selection::SourceSet("nope".to_owned()))
        .unwrap_err();
    assert_eq!(
        err,
        ResolutionError::UnknownSourceSet {
            alias: "nope".to_owned()
        }
    );
}

#[test]
fn unknown_source_in_set_is_reported() {
    let mut service = service(MemorySystem::new());
    let err = service
        .resolve(&config(), &Selection::SourceSet("broken".to_owned()))
        .unwrap_err();
    assert_eq!(
        err,
        ResolutionError::UnknownSource {
            alias: "missing".to_owned()
        }
    );
    assert_eq!(exit_code_for(&anyhow::Error::from(err)), 2);
}

#[test]
fn unknown_auth_is_reported() {
    let mut service = service(MemorySystem::new());
    let err = service
        .resolve(&config(), &Selection::Sources(vec!["orphan".to_owned()]))
        .unwrap_err();
    assert_eq!(
        err,
        ResolutionError::UnknownAuth {
            source_alias: "orphan".to_owned(),
            auth_alias: "nobody".to_owned(),
        }
    );
}

#[test]
fn environment_overrides_pat() {
    let system = MemorySystem::new()
        .with_env("GRAFTSET_ADO_PAT", "from-env")
        .with_env("GRAFTSET_GH_MAIN_PAT", "gh-env");
    let mut service = service(system);
    let targets = service
        .resolve(&config(), &Selection::SourceSet("service".to_owned()))
        .unwrap();

    for bound in targets {
        let pat = bound.target().auth.as_ref().unwrap().pat.as_deref();
        match bound.target().alias() {
            "base" => assert_eq!(pat, Some("from-env")),
            "ci" => assert_eq!(pat, Some("gh-env")),
            other => panic!("unexpected target {other}"),
        }
    }
}

#[test]
fn empty_environment_value_keeps_configured_pat() {
    let system = MemorySystem::new().with_env("GRAFTSET_ADO_PAT", "");
    let mut service = service(system);
    let targets = service
        .resolve(&config(), &Selection::Sources(vec!["base".to_owned()]))
        .unwrap();
    assert_eq!(
        targets[0].target().auth.as_ref().unwrap().pat.as_deref(),
        Some("from-file")
    );
}

#[test]
fn resolution_does_not_mutate_config() {
    let config = config();
    let system = MemorySystem::new().with_env("GRAFTSET_ADO_PAT", "from-env");
    let mut service = service(system);
    service
        .resolve(&config, &Selection::Sources(vec!["base".to_owned()]))
        .unwrap();
    assert_eq!(config.source_auths[0].pat.as_deref(), Some("from-file"));
}

}
