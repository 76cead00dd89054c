//! Command tests against temporary graph files.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use std::path::{Path, PathBuf};
use symgraph::cli::{
    Cli, Commands, Settings, cmd_anypath, cmd_attrs, cmd_canonical, cmd_complete, cmd_convert,
    cmd_export, cmd_find, cmd_hash, cmd_import, cmd_navigate, cmd_node, cmd_status, cmd_walk,
    execute, load_graph,
};
use symgraph::config::{AppConfig, Backend, LogFormat};
use symgraph_core::{Kind, NodeId};

// =============================================================================
// FIXTURES
// =============================================================================

const OS_RECORDS: &str = r#"[
  {"id": 1, "canonical_name": "os", "classification": 3,
   "members": [{"attr": "path", "node_id": 2}]},
  {"id": 2, "canonical_name": "os.path", "classification": 3,
   "members": [{"attr": "join", "node_id": 3}, {"attr": "sep", "node_id": 4}]},
  {"id": 3, "canonical_name": "os.path.join", "classification": 1},
  {"id": 4, "canonical_name": "os.path.sep", "classification": 5}
]"#;

const JSON_RECORDS: &str = r#"[
  {"id": 10, "canonical_name": "json", "classification": 3,
   "members": [{"attr": "dumps", "node_id": 11}, {"attr": "missing", "node_id": null}]},
  {"id": 11, "canonical_name": "json.dumps", "classification": 1}
]"#;

fn settings(graph: PathBuf, backend: Backend) -> Settings {
    Settings {
        graph,
        backend,
        json_mode: false,
        walk_limit: 100,
    }
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write fixture");
    path
}

/// A file-backend graph holding the `os` records.
fn imported(dir: &Path) -> Settings {
    let input = write(dir, "os.json", OS_RECORDS);
    let settings = settings(dir.join("graph.db"), Backend::File);
    cmd_import(&settings, &[input], false, &[], Kind::Module).expect("import");
    settings
}

// =============================================================================
// IMPORT AND LOOKUP
// =============================================================================

#[test]
fn import_then_find() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    let out = cmd_find(&settings, "os.path.join").expect("find");
    assert_eq!(
        out,
        "os.path.join -> os.path.join (function, id 3, any path os.path.join)\n"
    );
    assert_eq!(
        cmd_canonical(&settings, "os.path.join").expect("canonical"),
        "os.path.join\n"
    );
    assert_eq!(cmd_anypath(&settings, "os.path").expect("anypath"), "os.path\n");
}

#[test]
fn find_missing_component_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    let err = cmd_find(&settings, "sys").expect_err("sys is absent");
    assert!(err.is_not_found());
    let err = cmd_find(&settings, "os.nope").expect_err("nope is absent");
    assert_eq!(err.to_string(), "failed to find nope component in os.nope");
}

#[test]
fn json_mode_find() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = imported(dir.path());
    settings.json_mode = true;

    let out = cmd_find(&settings, "os.path.join").expect("find");
    let value: serde_json::Value = serde_json::from_str(&out).expect("json output");
    assert_eq!(value["id"], 3);
    assert_eq!(value["kind"], "function");
    assert_eq!(value["any_path"], "os.path.join");
    assert_eq!(value["ident"], "os.path.join");
}

#[test]
fn navigate_ignores_attribute_fallback() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    let out = cmd_navigate(&settings, "os.path.sep").expect("navigate");
    assert!(out.starts_with("os.path.sep -> os.path.sep (object"));
    let err = cmd_navigate(&settings, "os.sep").expect_err("sep is not a member of os");
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "failed to find sep component in os.sep");
}

#[test]
fn attrs_and_node_listing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    assert_eq!(cmd_attrs(&settings, "os.path", false).expect("attrs"), "join\nsep\n");
    assert_eq!(
        cmd_attrs(&settings, "os.path", true).expect("attrs"),
        "function:\n  join\nobject:\n  sep\n"
    );

    let out = cmd_node(&settings, 2).expect("node");
    assert!(out.contains("  .join -> os.path.join\n"));
    assert!(out.contains("  .sep -> os.path.sep\n"));
    assert_eq!(cmd_node(&settings, 99).expect("node"), "Node 99 not found\n");
}

// =============================================================================
// WALK AND COMPLETE
// =============================================================================

#[test]
fn walk_lists_depth_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    let out = cmd_walk(&settings, "os", None).expect("walk");
    assert_eq!(
        out,
        "os\tmodule\nos.path\tmodule\nos.path.join\tfunction\nos.path.sep\tobject\n"
    );
}

#[test]
fn walk_stops_at_limit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = imported(dir.path());
    settings.json_mode = true;

    let out = cmd_walk(&settings, "os", Some(2)).expect("walk");
    let value: serde_json::Value = serde_json::from_str(&out).expect("json output");
    assert_eq!(value["truncated"], true);
    let names: Vec<&str> = value["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["os", "os.path"]);
}

#[test]
fn walk_rejects_empty_ident() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    let err = cmd_walk(&settings, "", None).expect_err("empty ident");
    assert!(err.is_not_found());
}

#[test]
fn complete_prefixes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());

    assert_eq!(cmd_complete(&settings, "o", None, false).expect("complete"), "os\tmodule\n");
    assert_eq!(
        cmd_complete(&settings, "os.pa", None, false).expect("complete"),
        "os.path\tmodule\n"
    );
    assert_eq!(
        cmd_complete(&settings, "os.path.j", None, true).expect("complete"),
        "os.path.join\tfunction\n"
    );
    assert!(cmd_complete(&settings, "sys.x", None, false).is_err());
}

// =============================================================================
// IMPORT VARIANTS
// =============================================================================

#[test]
fn merge_and_link() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());
    let second = write(dir.path(), "json.json", JSON_RECORDS);

    let out = cmd_import(
        &settings,
        &[second],
        true,
        &["os.extra.thing".to_string()],
        Kind::Function,
    )
    .expect("merge");
    assert!(out.starts_with("Imported 2 records (1 paths linked)"));

    let graph = load_graph(&settings.graph, settings.backend).expect("load");
    assert!(graph.find("os.path.join").is_ok());
    assert!(graph.find("json.dumps").is_ok());
    let linked = graph.find("os.extra.thing").expect("linked");
    assert_eq!(linked.kind(), Kind::Function);
    assert_eq!(graph.find("os.extra").expect("intermediate").kind(), Kind::Module);

    let err = graph.find("json.missing").expect_err("nil member");
    assert_eq!(err.to_string(), "node for missing in json.missing was nil");
}

#[test]
fn records_resolve_across_inputs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let pkg = write(
        dir.path(),
        "pkg.json",
        r#"[{"id": 1, "canonical_name": "pkg", "classification": 3,
             "members": [{"attr": "f", "node_id": 2}]}]"#,
    );
    let leaf = write(
        dir.path(),
        "leaf.json",
        r#"[{"id": 2, "canonical_name": "pkg.f", "classification": 1}]"#,
    );
    let settings = settings(dir.path().join("graph.db"), Backend::File);
    cmd_import(&settings, &[pkg, leaf], false, &[], Kind::Module).expect("import");

    let graph = load_graph(&settings.graph, settings.backend).expect("load");
    assert_eq!(graph.find("pkg.f").expect("f").id(), NodeId(2));
}

#[test]
fn import_rejects_malformed_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bad = write(dir.path(), "bad.json", "{\"not\": \"an array\"}");
    let settings = settings(dir.path().join("graph.db"), Backend::File);
    assert!(cmd_import(&settings, &[bad], false, &[], Kind::Module).is_err());
    assert!(!settings.graph.exists());
}

// =============================================================================
// BACKENDS, EXPORT AND HASH
// =============================================================================

#[test]
fn convert_to_redb_keeps_hash() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = imported(dir.path());
    let file_hash = cmd_hash(&file).expect("hash");
    assert!(file_hash.starts_with("BLAKE3: "));
    assert_eq!(file_hash.trim_end().len(), "BLAKE3: ".len() + 64);

    let redb_path = dir.path().join("graph.redb");
    cmd_convert(&file, &redb_path, Backend::Redb).expect("convert");

    let redb = settings(redb_path, Backend::Redb);
    assert_eq!(cmd_hash(&redb).expect("hash"), file_hash);
    assert_eq!(
        cmd_canonical(&redb, "os.path.join").expect("canonical"),
        "os.path.join\n"
    );
}

#[test]
fn json_export_reimports_identically() {
    let dir = tempfile::tempdir().expect("temp dir");
    let original = imported(dir.path());
    let exported = dir.path().join("export.json");
    cmd_export(&original, &exported, "json").expect("export");

    let copy = settings(dir.path().join("copy.db"), Backend::File);
    cmd_import(&copy, &[exported], false, &[], Kind::Module).expect("import");
    assert_eq!(cmd_hash(&copy).expect("hash"), cmd_hash(&original).expect("hash"));
}

#[test]
fn canonical_export_loads_as_file_graph() {
    let dir = tempfile::tempdir().expect("temp dir");
    let original = imported(dir.path());
    let exported = dir.path().join("export.sym");
    let out = cmd_export(&original, &exported, "canonical").expect("export");
    assert!(out.starts_with("Checksum: "));

    let copy = settings(exported, Backend::File);
    assert_eq!(cmd_hash(&copy).expect("hash"), cmd_hash(&original).expect("hash"));
}

#[test]
fn export_rejects_unknown_format() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = imported(dir.path());
    let err = cmd_export(&settings, &dir.path().join("out"), "xml").expect_err("xml");
    assert!(err.to_string().contains("Unknown format: xml"));
}

#[test]
fn status_counts() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = imported(dir.path());

    let text = cmd_status(&settings).expect("status");
    assert!(text.contains("Nodes:        4\n"));
    assert!(text.contains("Packages:     1\n"));

    settings.json_mode = true;
    let value: serde_json::Value =
        serde_json::from_str(&cmd_status(&settings).expect("status")).expect("json output");
    assert_eq!(value["node_count"], 4);
    assert_eq!(value["any_path_count"], 4);
    assert_eq!(value["orphan_count"], 0);
    assert_eq!(value["kinds"]["module"], 2);
    assert_eq!(value["backend"], "file");
}

#[test]
fn missing_file_graph_is_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = settings(dir.path().join("absent.db"), Backend::File);
    let graph = load_graph(&settings.graph, settings.backend).expect("load");
    assert!(graph.is_empty());
}

// =============================================================================
// ARGUMENTS AND CONFIG
// =============================================================================

#[test]
fn flags_override_config() {
    let cli = Cli::try_parse_from(["symgraph", "-B", "file", "-G", "x.db", "walk", "os", "-l", "3"])
        .expect("parse");
    assert!(matches!(
        cli.command,
        Some(Commands::Walk { ref ident, limit: Some(3) }) if ident == "os"
    ));

    let config = AppConfig {
        graph: PathBuf::from("from-config.db"),
        backend: Backend::Redb,
        log_format: LogFormat::Json,
        walk_limit: 7,
    };
    let resolved = Settings::resolve(&cli, config);
    assert_eq!(resolved.graph, PathBuf::from("x.db"));
    assert_eq!(resolved.backend, Backend::File);
    assert_eq!(resolved.walk_limit, 7);
}

#[test]
fn config_fills_missing_flags() {
    let cli = Cli::try_parse_from(["symgraph", "status"]).expect("parse");
    let config = AppConfig::from_toml("graph = \"cfg.db\"\nbackend = \"file\"").expect("config");
    let resolved = Settings::resolve(&cli, config);
    assert_eq!(resolved.graph, PathBuf::from("cfg.db"));
    assert_eq!(resolved.backend, Backend::File);
    assert!(!resolved.json_mode);
}

#[test]
fn link_kind_parses_by_name() {
    let cli = Cli::try_parse_from([
        "symgraph", "import", "-i", "a.json", "--link", "p.q", "--link-kind", "type",
    ])
    .expect("parse");
    match cli.command {
        Some(Commands::Import { link, link_kind, .. }) => {
            assert_eq!(link, ["p.q"]);
            assert_eq!(link_kind, Kind::Type);
        }
        other => panic!("unexpected command: {:?}", other),
    }
    assert!(Cli::try_parse_from(["symgraph", "import", "-i", "a.json", "--link-kind", "class"]).is_err());
}

#[test]
fn config_file_loads_from_explicit_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write(dir.path(), "symgraph.toml", "walk_limit = 3\nbackend = \"file\"\n");
    let config = AppConfig::load(Some(&path)).expect("load");
    assert_eq!(config.walk_limit, 3);
    assert_eq!(config.backend, Backend::File);

    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn execute_runs_subcommand() {
    let dir = tempfile::tempdir().expect("temp dir");
    let imported = imported(dir.path());
    let graph = imported.graph.to_string_lossy().to_string();

    let cli = Cli::try_parse_from(["symgraph", "-B", "file", "-G", &graph, "canonical", "os.path"])
        .expect("parse");
    let out = execute(cli, AppConfig::default()).expect("execute");
    assert_eq!(out, "os.path\n");
}
