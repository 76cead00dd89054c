//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Each
//! command returns the text it wants printed; `main` does the printing.

use super::Settings;
use crate::config::Backend;
use serde::Serialize;
use std::path::{Path, PathBuf};
use symgraph_core::{
    DottedPath, FlatNode, Graph, GraphBuilder, GraphMetrics, Inflater, Interner, Kind, NodeId,
    NodeView, RedbNodeStore, SymGraphError,
    formats::{graph_crypto_hash, graph_from_bytes, graph_to_bytes, records_checksum},
    primitives::{MAGIC_BYTES, MAX_IMPORT_NODE_COUNT},
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for JSON record imports (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum file size for a canonical graph file (1 GB).
const MAX_GRAPH_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SymGraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SymGraphError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SymGraphError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path: canonicalized, existing, and a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SymGraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        SymGraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SymGraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, SymGraphError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SymGraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SymGraphError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SymGraphError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn to_json(value: &serde_json::Value) -> Result<String, SymGraphError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| SymGraphError::SerializationError(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

fn path_or_none(path: Option<&DottedPath>) -> String {
    path.map_or_else(|| "(none)".to_string(), ToString::to_string)
}

fn node_json(node: NodeView<'_>) -> serde_json::Value {
    serde_json::json!({
        "id": node.id().0,
        "kind": node.kind().name(),
        "canonical_name": node.canonical_name().to_string(),
        "any_path": node.any_path().map(ToString::to_string),
    })
}

fn node_line(node: NodeView<'_>) -> String {
    format!(
        "{} ({}, id {}, any path {})",
        node.canonical_name(),
        node.kind(),
        node.id().0,
        path_or_none(node.any_path())
    )
}

// =============================================================================
// LOOKUP COMMANDS
// =============================================================================

/// Resolve a dotted identifier through attribute lookup.
pub fn cmd_find(settings: &Settings, ident: &str) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let node = graph.find(ident)?;

    if settings.json_mode {
        let mut value = node_json(node);
        value["ident"] = serde_json::Value::from(ident);
        return to_json(&value);
    }
    Ok(format!("{} -> {}\n", ident, node_line(node)))
}

/// Resolve a dotted path through members only.
pub fn cmd_navigate(settings: &Settings, path: &str) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let dotted = DottedPath::new(path);
    let node = graph.navigate(&dotted)?;

    if settings.json_mode {
        let mut value = node_json(node);
        value["path"] = serde_json::Value::from(dotted.to_string());
        return to_json(&value);
    }
    Ok(format!("{} -> {}\n", dotted, node_line(node)))
}

/// Print the canonical name of a dotted identifier.
pub fn cmd_canonical(settings: &Settings, ident: &str) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let name = graph.canonical_name(ident)?;

    if settings.json_mode {
        return to_json(&serde_json::json!({
            "ident": ident,
            "canonical_name": name,
        }));
    }
    Ok(format!("{}\n", name))
}

/// Print the canonical shortest path of a dotted identifier.
pub fn cmd_anypath(settings: &Settings, ident: &str) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let node = graph.find(ident)?;

    if settings.json_mode {
        return to_json(&serde_json::json!({
            "ident": ident,
            "any_path": node.any_path().map(ToString::to_string),
        }));
    }
    Ok(format!("{}\n", path_or_none(node.any_path())))
}

/// List the attributes of a node.
pub fn cmd_attrs(settings: &Settings, ident: &str, by_kind: bool) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let node = graph.find(ident)?;

    if by_kind {
        let groups = node.attrs_by_kind();
        if settings.json_mode {
            let map: serde_json::Map<String, serde_json::Value> = groups
                .iter()
                .map(|(kind, names)| (kind.name().to_string(), serde_json::json!(names)))
                .collect();
            return to_json(&serde_json::Value::Object(map));
        }

        let mut out = String::new();
        for (kind, names) in &groups {
            out.push_str(&format!("{}:\n", kind));
            for name in names {
                out.push_str(&format!("  {}\n", name));
            }
        }
        return Ok(out);
    }

    let names = node.attrs();
    if settings.json_mode {
        return to_json(&serde_json::json!(names));
    }
    let mut out = String::new();
    for name in names {
        out.push_str(&format!("{}\n", name));
    }
    Ok(out)
}

/// Look a node up by persisted id.
pub fn cmd_node(settings: &Settings, id: u64) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let found = graph.find_by_id(NodeId(id));

    if settings.json_mode {
        return to_json(&serde_json::json!({
            "id": id,
            "node": found.map(node_json),
        }));
    }

    let Some(node) = found else {
        return Ok(format!("Node {} not found\n", id));
    };

    let mut out = format!("{}\n", node_line(node));
    if let Some(ty) = node.type_node() {
        out.push_str(&format!("  type: {}\n", ty.canonical_name()));
    }
    for base in node.bases() {
        let name = base.map_or_else(|| "(unresolved)".to_string(), |b| b.canonical_name().to_string());
        out.push_str(&format!("  base: {}\n", name));
    }
    for (name, target) in node.members() {
        let target = target.map_or_else(|| "(nil)".to_string(), |t| t.canonical_name().to_string());
        out.push_str(&format!("  .{} -> {}\n", name, target));
    }
    Ok(out)
}

// =============================================================================
// WALK COMMANDS
// =============================================================================

/// One node reached by a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkEntry {
    pub name: String,
    pub kind: &'static str,
    pub id: u64,
}

/// Collected walk results, capped at `limit` entries.
struct WalkCollector {
    limit: usize,
    entries: Vec<WalkEntry>,
    truncated: bool,
}

impl WalkCollector {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
            truncated: false,
        }
    }

    /// Record `node`; false once the cap is reached.
    fn visit(&mut self, name: &str, node: NodeView<'_>) -> bool {
        if self.entries.len() >= self.limit {
            self.truncated = true;
            return false;
        }
        self.entries.push(WalkEntry {
            name: name.to_string(),
            kind: node.kind().name(),
            id: node.id().0,
        });
        true
    }

    fn render(self, json_mode: bool) -> Result<String, SymGraphError> {
        if json_mode {
            return to_json(&serde_json::json!({
                "entries": self.entries,
                "truncated": self.truncated,
            }));
        }

        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("{}\t{}\n", entry.name, entry.kind));
        }
        if self.truncated {
            out.push_str(&format!("... stopped after {} nodes\n", self.limit));
        }
        Ok(out)
    }
}

/// Depth-first listing of everything reachable from an identifier.
pub fn cmd_walk(
    settings: &Settings,
    ident: &str,
    limit: Option<usize>,
) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let mut collector = WalkCollector::new(limit.unwrap_or(settings.walk_limit));
    graph.walk(ident, |name, node| collector.visit(name, node))?;
    collector.render(settings.json_mode)
}

/// Complete a dotted prefix.
pub fn cmd_complete(
    settings: &Settings,
    prefix: &str,
    limit: Option<usize>,
    recursive: bool,
) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let mut collector = WalkCollector::new(limit.unwrap_or(settings.walk_limit));
    graph.walk_prefix(prefix, |name, node| collector.visit(name, node) && recursive)?;
    collector.render(settings.json_mode)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph metrics.
pub fn cmd_status(settings: &Settings) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let metrics = GraphMetrics::from_graph(&graph);

    if settings.json_mode {
        let kinds: serde_json::Map<String, serde_json::Value> = metrics
            .kinds
            .iter()
            .map(|(kind, count)| (kind.name().to_string(), serde_json::json!(count)))
            .collect();
        return to_json(&serde_json::json!({
            "graph": settings.graph.to_string_lossy(),
            "backend": settings.backend.name(),
            "node_count": metrics.node_count,
            "package_count": metrics.package_count,
            "member_edge_count": metrics.member_edge_count,
            "nil_member_count": metrics.nil_member_count,
            "any_path_count": metrics.any_path_count,
            "locked_count": metrics.locked_count,
            "orphan_count": metrics.orphan_count,
            "coverage_per_thousand": metrics.coverage_per_thousand(),
            "kinds": kinds,
        }));
    }

    let mut out = String::new();
    out.push_str("symgraph Status\n");
    out.push_str("===============\n");
    out.push_str(&format!("Graph:    {:?}\n", settings.graph));
    out.push_str(&format!("Backend:  {}\n\n", settings.backend.name()));
    out.push_str(&format!("Nodes:        {}\n", metrics.node_count));
    out.push_str(&format!("Packages:     {}\n", metrics.package_count));
    out.push_str(&format!(
        "Members:      {} ({} nil)\n",
        metrics.member_edge_count, metrics.nil_member_count
    ));
    out.push_str(&format!(
        "Any paths:    {} ({} locked, {} per thousand)\n",
        metrics.any_path_count,
        metrics.locked_count,
        metrics.coverage_per_thousand()
    ));
    out.push_str(&format!("Orphans:      {}\n", metrics.orphan_count));
    for (kind, count) in &metrics.kinds {
        out.push_str(&format!("  {:<12}{}\n", kind.name(), count));
    }
    Ok(out)
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Read one JSON array of flat records.
fn read_json_records(path: &Path) -> Result<Vec<FlatNode>, SymGraphError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| SymGraphError::IoError(format!("Read file: {}", e)))?;
    let records: Vec<FlatNode> = serde_json::from_slice(&data).map_err(|e| {
        SymGraphError::DeserializationError(format!("{}: {}", path.display(), e))
    })?;

    if records.len() as u64 > MAX_IMPORT_NODE_COUNT {
        return Err(SymGraphError::DeserializationError(format!(
            "Record count {} exceeds maximum {}",
            records.len(),
            MAX_IMPORT_NODE_COUNT
        )));
    }
    Ok(records)
}

/// Import flat JSON records, link extra paths and persist the result.
pub fn cmd_import(
    settings: &Settings,
    inputs: &[PathBuf],
    merge: bool,
    links: &[String],
    link_kind: Kind,
) -> Result<String, SymGraphError> {
    let mut interner = Interner::new();
    let mut inflater = if merge {
        let existing = load_graph(&settings.graph, settings.backend)?;
        Inflater::extend(existing.into_builder(), &mut interner)
    } else {
        Inflater::new(&mut interner)
    };

    let mut record_count = 0usize;
    for input in inputs {
        let records = read_json_records(input)?;
        tracing::info!(path = %input.display(), records = records.len(), "importing records");
        record_count += records.len();
        inflater.add_source(&records);
    }

    let mut builder = inflater.finish();
    let mut linked = 0usize;
    for link in links {
        if builder.link(&DottedPath::new(link), link_kind).is_some() {
            linked += 1;
        }
    }

    let graph = builder.build();
    save_graph(&graph, &settings.graph, settings.backend)?;

    Ok(format!(
        "Imported {} records ({} paths linked)\nGraph now has {} nodes, {} packages\n",
        record_count,
        linked,
        graph.len(),
        graph.packages().count()
    ))
}

// =============================================================================
// EXPORT / CONVERT COMMANDS
// =============================================================================

/// Export the graph in canonical or JSON form.
pub fn cmd_export(settings: &Settings, output: &Path, format: &str) -> Result<String, SymGraphError> {
    let validated_output = validate_output_path(output)?;
    let graph = load_graph(&settings.graph, settings.backend)?;

    let mut out = String::new();
    let data = match format {
        "canonical" => {
            let checksum = records_checksum(&graph.flatten_all());
            out.push_str(&format!("Checksum: {}\n", checksum));
            graph_to_bytes(&graph)?
        }
        "json" => serde_json::to_vec_pretty(&graph.flatten_all())
            .map_err(|e| SymGraphError::SerializationError(e.to_string()))?,
        _ => {
            return Err(SymGraphError::SerializationError(format!(
                "Unknown format: {}. Use: canonical, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| SymGraphError::IoError(format!("Write file: {}", e)))?;

    out.push_str(&format!("Exported {} bytes to {:?}\n", data.len(), validated_output));
    Ok(out)
}

/// Copy the graph to `output` using the `to` backend.
pub fn cmd_convert(settings: &Settings, output: &Path, to: Backend) -> Result<String, SymGraphError> {
    let validated_output = validate_output_path(output)?;
    let graph = load_graph(&settings.graph, settings.backend)?;
    save_graph(&graph, &validated_output, to)?;

    Ok(format!(
        "Converted {} nodes from {} to {} at {:?}\n",
        graph.len(),
        settings.backend.name(),
        to.name(),
        validated_output
    ))
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// BLAKE3 digest of the graph's canonical bytes.
///
/// The digest does not depend on the backend the graph was loaded from.
pub fn cmd_hash(settings: &Settings) -> Result<String, SymGraphError> {
    let graph = load_graph(&settings.graph, settings.backend)?;
    let hash = graph_crypto_hash(&graph)?;

    if settings.json_mode {
        return to_json(&serde_json::json!({
            "hash": hash,
            "algorithm": "blake3",
            "node_count": graph.len(),
        }));
    }
    Ok(format!("BLAKE3: {}\n", hash))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load the graph at `path`.
///
/// A missing file-backend graph loads as an empty graph; a missing redb
/// database is created empty. File-backend graphs are accepted in canonical
/// form or as a JSON array of records.
pub fn load_graph(path: &Path, backend: Backend) -> Result<Graph, SymGraphError> {
    let mut interner = Interner::new();

    match backend {
        Backend::Redb => {
            let store = RedbNodeStore::open(path)?;
            let records = store.read_nodes()?;
            Ok(Graph::from_flat(&records, &mut interner))
        }
        Backend::File => {
            if !path.exists() {
                tracing::info!(path = %path.display(), "no graph file, starting empty");
                return Ok(GraphBuilder::new().build());
            }

            validate_file_size(path, MAX_GRAPH_FILE_SIZE)?;
            let data = std::fs::read(path)
                .map_err(|e| SymGraphError::IoError(format!("Read graph: {}", e)))?;

            if data.starts_with(MAGIC_BYTES) {
                return graph_from_bytes(&data, &mut interner);
            }

            if let Ok(records) = serde_json::from_slice::<Vec<FlatNode>>(&data) {
                return Ok(Graph::from_flat(&records, &mut interner));
            }

            Err(SymGraphError::DeserializationError(
                "Could not parse graph file".to_string(),
            ))
        }
    }
}

/// Persist `graph` at `path`, replacing whatever was stored there.
pub fn save_graph(graph: &Graph, path: &Path, backend: Backend) -> Result<(), SymGraphError> {
    match backend {
        Backend::Redb => {
            let mut store = RedbNodeStore::open(path)?;
            store.replace_nodes(&graph.flatten_all())
        }
        Backend::File => {
            let data = graph_to_bytes(graph)?;
            std::fs::write(path, &data)
                .map_err(|e| SymGraphError::IoError(format!("Write graph: {}", e)))
        }
    }
}
