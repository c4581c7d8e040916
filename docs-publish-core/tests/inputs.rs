use std::collections::HashMap;
use std::path::PathBuf;

use docs_publish_core::inputs::{
    branch_from_ref, normalize_output_path, parse_orphan, parse_repository, resolve_branch,
    ActionInputs, ActionSettings, ConfigError,
};

#[test]
fn output_paths_are_normalized() {
    let cases = [
        ("./a//b.html", "a/b.html"),
        ("index.html", "index.html"),
        ("/index.html", "index.html"),
        ("../../docs/index.html", "docs/index.html"),
        ("././/./site///index.html", "site/index.html"),
        ("docs////api//index.html", "docs/api/index.html"),
        (".hidden/index.html", "hidden/index.html"),
        ("./", ""),
        // Inputs arrive trimmed, as the runner toolkit hands them over.
        ("  ./site//index.html\n", "site/index.html"),
    ];
    for (raw, expected) in cases {
        assert_eq!(normalize_output_path(raw), expected, "input {raw:?}");
    }
}

#[test]
fn orphan_accepts_only_documented_truthy_values() {
    for truthy in ["true", "True", "TRUE", "1"] {
        assert!(parse_orphan(truthy), "{truthy:?} should be truthy");
    }
    for falsy in ["", "false", "0", "yes", "tRuE", "2"] {
        assert!(!parse_orphan(falsy), "{falsy:?} should be falsy");
    }
}

#[test]
fn branch_defaults_to_checked_out_ref() {
    assert_eq!(branch_from_ref("refs/heads/feature/docs"), "feature/docs");
    assert_eq!(
        resolve_branch(Some("gh-pages"), Some("refs/heads/main")).unwrap(),
        "gh-pages"
    );
    assert_eq!(resolve_branch(Some(""), Some("refs/heads/main")).unwrap(), "main");
    assert_eq!(resolve_branch(None, Some("refs/heads/dev")).unwrap(), "dev");
    assert!(matches!(
        resolve_branch(None, None),
        Err(ConfigError::Invalid { name: "branch", .. })
    ));
}

#[test]
fn repository_coordinate_is_split() {
    assert_eq!(
        parse_repository("acme/docs").unwrap(),
        ("acme".to_string(), "docs".to_string())
    );
    for bad in ["acme", "/docs", "acme/", "acme/docs/extra"] {
        assert!(parse_repository(bad).is_err(), "{bad:?} should be rejected");
    }
}

fn runner_env() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("GITHUB_TOKEN", "ghs_secret"),
        ("LIBRIS_API_KEY", "libris_secret"),
        ("GITHUB_REPOSITORY", "acme/docs"),
        ("GITHUB_WORKSPACE", "/github/workspace"),
        ("GITHUB_REF", "refs/heads/main"),
    ])
}

fn lookup(env: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
    move |name: &str| env.get(name).map(|v| v.to_string())
}

fn inputs() -> ActionInputs {
    ActionInputs {
        config: "docs/libris.json".into(),
        output: "./site//index.html".into(),
        branch: None,
        orphan: Some("TRUE".into()),
    }
}

#[test]
fn settings_resolve_from_fabricated_environment() {
    let settings = ActionSettings::resolve(inputs(), lookup(runner_env())).expect("valid settings");

    assert_eq!(settings.owner, "acme");
    assert_eq!(settings.repo, "docs");
    assert_eq!(settings.branch, "main");
    assert!(settings.orphan);
    assert_eq!(settings.output_path, "site/index.html");
    assert_eq!(
        settings.abs_config_path(),
        PathBuf::from("/github/workspace/docs/libris.json")
    );

    let request = settings.publish_request(b"<html/>".to_vec()).unwrap();
    assert_eq!(request.path, "site/index.html");
    assert_eq!(request.branch, "main");
}

#[test]
fn secrets_are_not_printed_by_debug() {
    let settings = ActionSettings::resolve(inputs(), lookup(runner_env())).unwrap();
    let debug = format!("{settings:?}");
    assert!(!debug.contains("ghs_secret"));
    assert!(!debug.contains("libris_secret"));
}

#[test]
fn missing_or_empty_secrets_fail_first() {
    let mut env = runner_env();
    env.remove("GITHUB_TOKEN");
    env.remove("GITHUB_REPOSITORY");
    let err = ActionSettings::resolve(inputs(), lookup(env)).unwrap_err();
    assert_eq!(err, ConfigError::MissingSecret("GITHUB_TOKEN"));
    assert!(err.to_string().contains("GITHUB_TOKEN"));

    let mut env = runner_env();
    env.insert("LIBRIS_API_KEY", "");
    let err = ActionSettings::resolve(inputs(), lookup(env)).unwrap_err();
    assert_eq!(err, ConfigError::MissingSecret("LIBRIS_API_KEY"));
}

#[test]
fn required_inputs_and_runner_variables_are_checked() {
    let mut no_config = inputs();
    no_config.config = String::new();
    assert_eq!(
        ActionSettings::resolve(no_config, lookup(runner_env())).unwrap_err(),
        ConfigError::MissingInput("config")
    );

    let mut no_output = inputs();
    no_output.output = "./".into();
    assert_eq!(
        ActionSettings::resolve(no_output, lookup(runner_env())).unwrap_err(),
        ConfigError::MissingInput("output")
    );

    let mut env = runner_env();
    env.remove("GITHUB_REPOSITORY");
    assert_eq!(
        ActionSettings::resolve(inputs(), lookup(env)).unwrap_err(),
        ConfigError::MissingEnv("GITHUB_REPOSITORY")
    );
}

#[test]
fn explicit_branch_and_workspace_default() {
    let mut env = runner_env();
    env.remove("GITHUB_WORKSPACE");
    let mut explicit = inputs();
    explicit.branch = Some("gh-pages".into());
    explicit.orphan = None;

    let settings = ActionSettings::resolve(explicit, lookup(env)).unwrap();
    assert_eq!(settings.branch, "gh-pages");
    assert!(!settings.orphan);
    assert_eq!(settings.workspace, PathBuf::from("."));
}
