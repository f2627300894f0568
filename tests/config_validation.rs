// tests/config_validation.rs

use std::fs;

use assetdag::config::{
    ConfigFile, ConfigSource, DEFAULT_CONFIG_FILE, load_builtin, parse_raw, resolve,
};
use assetdag::errors::AssetdagError;
use assetdag::types::TaskKind;

fn validate(toml: &str) -> Result<ConfigFile, AssetdagError> {
    ConfigFile::try_from(parse_raw(toml)?)
}

fn expect_config_error(toml: &str, needle: &str) {
    match validate(toml) {
        Err(AssetdagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

const TASKS: &str = r#"
[task.clean]
kind = "clean"

[task.markup]
kind = "include"
src = ["src/*.html"]
dest = "dist"

[task.images]
kind = "copy"
src = ["src/images/**/*"]
dest = "dist/images"
"#;

#[test]
fn builtin_definition_is_valid() {
    let cfg = load_builtin().unwrap();

    let default = cfg.pipeline("default").unwrap();
    assert!(default.watch());
    assert!(default.serve());
    assert_eq!(default.tasks()[0], "clean");
    for task in &default.tasks()[1..] {
        assert_eq!(default.dependencies_of(task), vec!["clean".to_string()]);
    }

    let build = cfg.pipeline("build").unwrap();
    assert!(!build.watch());
    assert_eq!(
        build.dependencies_of("images-compress"),
        vec!["styles".to_string()]
    );
    assert_eq!(cfg.task("clean").unwrap().kind(), TaskKind::Clean);
}

#[test]
fn pipeline_with_unknown_task_is_rejected() {
    expect_config_error(
        &format!("{TASKS}\n[pipeline.default]\nsteps = [\"clean\", \"deploy\"]\n"),
        "unknown task 'deploy'",
    );
}

#[test]
fn task_listed_twice_is_rejected() {
    expect_config_error(
        &format!(
            "{TASKS}\n[pipeline.default]\nsteps = [\"clean\", {{ parallel = [\"markup\", \"markup\"] }}]\n"
        ),
        "more than once",
    );
}

#[test]
fn clean_must_precede_everything() {
    expect_config_error(
        &format!("{TASKS}\n[pipeline.default]\nsteps = [\"markup\", \"clean\"]\n"),
        "not ordered after clean task",
    );
    expect_config_error(
        &format!("{TASKS}\n[pipeline.default]\nsteps = [{{ parallel = [\"clean\", \"images\"] }}]\n"),
        "not ordered after clean task",
    );
}

#[test]
fn empty_pipeline_is_rejected() {
    expect_config_error(
        &format!("{TASKS}\n[pipeline.default]\nsteps = [{{ parallel = [] }}]\n"),
        "has no tasks",
    );
}

#[test]
fn task_fields_are_checked() {
    expect_config_error(
        r#"
[task.images]
kind = "copy"
src = ["src/images/**/*"]

[pipeline.default]
steps = ["images"]
"#,
        "require `dest`",
    );

    expect_config_error(
        r#"
[task.images]
kind = "copy"
src = ["src/images/**/*"]
dest = "../elsewhere"

[pipeline.default]
steps = ["images"]
"#,
        "inside the project root",
    );

    expect_config_error(
        r#"
[task.styles]
kind = "command"
mode = "once"
cmd = "sass {entry} {output}"
src = ["src/style/*.scss"]
dest = "dist/style"

[pipeline.default]
steps = ["styles"]
"#,
        "requires `output`",
    );

    expect_config_error(
        r#"
[task.images]
kind = "copy"
src = ["src/images/**/*"]
dest = "dist/images"
watch = ["src/[images"]

[pipeline.default]
steps = ["images"]
"#,
        "task 'images'",
    );
}

#[test]
fn zero_queue_length_is_rejected() {
    expect_config_error(
        &format!("[config]\nqueue_length = 0\n{TASKS}\n[pipeline.default]\nsteps = [\"clean\"]\n"),
        "queue_length",
    );
}

#[test]
fn unknown_task_kind_fails_to_parse() {
    let err = validate("[task.x]\nkind = \"minify\"\n").unwrap_err();
    assert!(matches!(err, AssetdagError::TomlError(_)));
}

#[test]
fn resolve_prefers_project_file_then_builtin() {
    let dir = tempfile::tempdir().unwrap();

    let (_, source) = resolve(None, dir.path()).unwrap();
    assert_eq!(source, ConfigSource::Builtin);

    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(
        &path,
        format!("{TASKS}\n[pipeline.site]\nsteps = [\"clean\", \"markup\"]\n"),
    )
    .unwrap();
    let (cfg, source) = resolve(None, dir.path()).unwrap();
    assert_eq!(source, ConfigSource::File(path));
    assert!(cfg.pipeline("site").is_some());
    assert!(cfg.pipeline("default").is_none());

    let missing = dir.path().join("nope.toml");
    match resolve(Some(missing.as_path()), dir.path()) {
        Err(AssetdagError::ConfigError(msg)) => assert!(msg.contains("does not exist")),
        other => panic!("Expected ConfigError, got: {:?}", other.map(|(_, s)| s)),
    }
}
