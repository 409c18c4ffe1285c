use crate::weights::{DocumentWeights, TermWeight, WeightKind};
use crate::{DocId, InvertedIndex};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

/// On-disk layout of the derived artifacts under one output root.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn weights_dir(&self) -> PathBuf { self.root.join("tf_idf") }
}

/// Sibling path used while a replacement is being written.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the index as pretty JSON; non-ASCII terms are written as-is.
/// The previous index stays readable until the new one is complete.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let target = paths.inverted_index();
    let staging = staging_path(&target);
    let f = File::create(&staging).with_context(|| format!("creating {}", staging.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, index)?;
    w.flush()?;
    drop(w);
    fs::rename(&staging, &target).with_context(|| format!("replacing {}", target.display()))?;
    Ok(())
}

/// Loads the index. Entries whose value is not a list of ids are skipped.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let path = paths.inverted_index();
    let mut buf = String::new();
    File::open(&path)
        .with_context(|| format!("opening inverted index {}", path.display()))?
        .read_to_string(&mut buf)?;
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&buf)
        .with_context(|| format!("parsing inverted index {}", path.display()))?;

    let mut postings: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
    for (term, value) in raw {
        match serde_json::from_value::<Vec<DocId>>(value) {
            Ok(ids) => { postings.insert(term, ids); }
            Err(err) => tracing::warn!(term = %term, %err, "malformed posting list, skipping"),
        }
    }
    let index = InvertedIndex::from_postings(postings);
    tracing::info!(path = %path.display(), num_terms = index.len(), "loaded inverted index");
    Ok(index)
}

pub fn format_weights(weights: &[TermWeight]) -> String {
    let mut out = String::new();
    for w in weights {
        let _ = writeln!(out, "{} {:.6} {:.6}", w.term, w.idf, w.tfidf);
    }
    out
}

/// Replaces the whole weight directory with one token file and one lemma file per
/// document. Files of documents no longer in `weights` do not survive a rebuild.
pub fn save_weights(paths: &IndexPaths, weights: &[DocumentWeights]) -> Result<()> {
    let dir = paths.weights_dir();
    let staging = staging_path(&dir);
    if staging.exists() {
        fs::remove_dir_all(&staging).with_context(|| format!("clearing {}", staging.display()))?;
    }
    create_dir_all(&staging)?;
    for doc in weights {
        for kind in [WeightKind::Tokens, WeightKind::Lemmas] {
            fs::write(staging.join(kind.file_name(doc.doc_id)), format_weights(doc.get(kind)))?;
        }
    }
    if dir.exists() {
        fs::remove_dir_all(&dir).with_context(|| format!("removing stale weights {}", dir.display()))?;
    }
    fs::rename(&staging, &dir).with_context(|| format!("replacing {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), num_docs = weights.len(), "wrote weight files");
    Ok(())
}

/// Parses `term idf tfidf` lines into term -> tfidf. Malformed lines, and weights
/// that are negative or not finite, are skipped.
pub fn parse_weights(content: &str) -> HashMap<String, f64> {
    let mut vector = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() { continue; }
        match (parts.len() >= 3).then(|| parts[2].parse::<f64>()) {
            Some(Ok(tfidf)) if tfidf.is_finite() && tfidf >= 0.0 => { vector.insert(parts[0].to_string(), tfidf); }
            _ => tracing::warn!(line = lineno + 1, "malformed weight line, skipping"),
        }
    }
    vector
}

/// Loads every stored weight vector of `kind`. A missing directory yields no vectors.
pub fn load_weights(paths: &IndexPaths, kind: WeightKind) -> Result<BTreeMap<DocId, HashMap<String, f64>>> {
    let dir = paths.weights_dir();
    let mut vectors = BTreeMap::new();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "weight directory unavailable");
            return Ok(vectors);
        }
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(doc_id) = kind.doc_id_from_file_name(&name) else { continue };
        match fs::read_to_string(entry.path()) {
            Ok(content) => { vectors.insert(doc_id, parse_weights(&content)); }
            Err(err) => tracing::warn!(file = %name, %err, "failed to read weights"),
        }
    }
    tracing::info!(dir = %dir.display(), ?kind, num_docs = vectors.len(), "loaded weight vectors");
    Ok(vectors)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
