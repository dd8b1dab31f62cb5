//! CLI command implementations

use anyhow::Context;
use codag_core::{GraphSnapshot, Language, WorkflowDetector, WorkflowHint, compute_graph_diff, has_diff};
use codag_indexer::config::ScanConfig;
use codag_indexer::{
    AnalysisConfig, Extractor, ParserManager, RepoStructure, SourceFile, build_workflow_graph, repair_hints,
};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub fn analyze(
    root: &Path,
    config: Option<&Path>,
    hints: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(root, config)?;
    let repo = scan_repo(root, &config)?;
    let snapshot = build_snapshot(&repo, hints.map(load_hints).transpose()?);

    tracing::info!(
        "Analyzed {} files: {} nodes, {} edges, {} workflows",
        repo.files.len(),
        snapshot.nodes.len(),
        snapshot.edges.len(),
        snapshot.workflows.len()
    );

    let json = snapshot.to_json()?;
    match output {
        Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

pub fn structure(root: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(root, config)?;
    let repo = scan_repo(root, &config)?;
    println!("{}", serde_json::to_string_pretty(&repo)?);
    Ok(())
}

pub fn callgraph(file: &Path) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let root = file.parent().unwrap_or(Path::new("."));
    let extractor = Extractor::new(&load_config(root, None)?)?;
    let mut parsers = ParserManager::new();
    let graph = extractor.extract_call_graph(&mut parsers, &code, file);
    parsers.dispose();
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

/// Prints the diff and returns whether the snapshots differ.
pub fn diff(old: &Path, new: &Path) -> anyhow::Result<bool> {
    let old = read_snapshot(old)?;
    let new = read_snapshot(new)?;
    let diff = compute_graph_diff(&old, &new);
    println!("{}", serde_json::to_string_pretty(&diff)?);
    Ok(has_diff(&diff))
}

fn read_snapshot(path: &Path) -> anyhow::Result<GraphSnapshot> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    GraphSnapshot::from_json(&json).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let config = match explicit {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::discover(root)?.unwrap_or_default(),
    };
    Ok(config)
}

fn load_hints(path: &Path) -> anyhow::Result<Vec<WorkflowHint>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing hints {}", path.display()))
}

fn scan_repo(root: &Path, config: &AnalysisConfig) -> anyhow::Result<RepoStructure> {
    let sources = walk_sources(root, &config.scan)?;
    tracing::info!("Scanning {} source files under {}", sources.len(), root.display());
    let extractor = Extractor::new(config)?;
    let mut parsers = ParserManager::new();
    let repo = extractor.extract_repo_structure(&mut parsers, &sources);
    parsers.dispose();
    Ok(repo)
}

/// Source files under `root` with a supported extension, as root-relative
/// paths. Honours `.gitignore`, the exclude globs and the size cap.
fn walk_sources(root: &Path, scan: &ScanConfig) -> anyhow::Result<Vec<SourceFile>> {
    let excluded = scan.exclude_set()?;
    let mut sources = Vec::new();

    for entry in WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        if Language::from_path(&relative).is_none() || excluded.is_match(&relative) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > scan.max_file_size {
            tracing::debug!("Skipping {} ({} bytes)", relative.display(), size);
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => sources.push(SourceFile::new(relative, content)),
            Err(e) => tracing::warn!("Cannot read {}: {}", path.display(), e),
        }
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

/// Static graph, hint repair and detection, stamped with the current time.
fn build_snapshot(repo: &RepoStructure, hints: Option<Vec<WorkflowHint>>) -> GraphSnapshot {
    let (nodes, edges) = build_workflow_graph(repo);

    let mut hints = hints.unwrap_or_default();
    if !hints.is_empty() {
        let known: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
        repair_hints(&mut hints, &known);
    }

    let detection = WorkflowDetector::new().detect(&nodes, &edges, Some(hints.as_slice()));
    let mut snapshot = GraphSnapshot::new(detection.nodes, detection.edges, detection.workflows);
    snapshot.generated_at = Some(chrono::Utc::now().to_rfc3339());
    snapshot
}
