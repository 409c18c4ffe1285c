use crate::DocId;
use anyhow::{bail, Result};
use scraper::{Html, Node, Selector};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TITLE_SELECTORS: [&str; 2] = ["title", "h1, h2, h3, h4, h5, h6"];

/// A corpus page: raw markup plus the text and title extracted from it once at load.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub raw: String,
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn from_html(id: DocId, raw: String) -> Self {
        let html = Html::parse_document(&raw);
        let title = extract_title(&html).unwrap_or_else(|| placeholder_title(id));
        let text = extract_text(&html);
        Self { id, raw, title, text }
    }

    pub fn file_name(&self) -> String { page_file_name(self.id) }
}

#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    /// Pages whose content could not be read; they stay in the corpus with empty text.
    pub failed: usize,
}

impl Corpus {
    pub fn ids(&self) -> impl Iterator<Item = DocId> + '_ { self.documents.iter().map(|d| d.id) }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

pub fn page_file_name(id: DocId) -> String { format!("page_{id:03}.html") }

/// `page_007.html` -> 7
pub fn doc_id_from_file_name(name: &str) -> Option<DocId> {
    let (_, rest) = name.split_once('_')?;
    rest.split('.').next()?.parse().ok()
}

/// Loads every `*.html` page of `dir`, ordered by id. A missing directory is an error.
pub fn load_corpus<P: AsRef<Path>>(dir: P) -> Result<Corpus> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("corpus directory {} does not exist", dir.display());
    }

    let mut pages: BTreeMap<DocId, PathBuf> = BTreeMap::new();
    // sorted: the first file name wins for a duplicated id
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("html") { continue; }
        let name = entry.file_name().to_string_lossy();
        let Some(id) = doc_id_from_file_name(&name) else {
            tracing::warn!(file = %name, "file name carries no document id, skipping");
            continue;
        };
        match pages.entry(id) {
            Entry::Vacant(slot) => { slot.insert(p.to_path_buf()); }
            Entry::Occupied(kept) => tracing::warn!(
                id,
                file = %name,
                kept = %kept.get().display(),
                "duplicate document id, skipping file"
            ),
        }
    }

    let mut corpus = Corpus::default();
    for (id, path) in pages {
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read page, treating as empty");
                corpus.failed += 1;
                String::new()
            }
        };
        corpus.documents.push(Document::from_html(id, raw));
    }
    tracing::info!(num_docs = corpus.len(), failed = corpus.failed, dir = %dir.display(), "loaded corpus");
    Ok(corpus)
}

fn placeholder_title(id: DocId) -> String { format!("Document {id}") }

fn extract_title(html: &Html) -> Option<String> {
    TITLE_SELECTORS.into_iter().find_map(|css| {
        let sel = Selector::parse(css).ok()?;
        let found = html
            .select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|t| !t.is_empty());
        found
    })
}

/// Visible text: script and style contents dropped, whitespace runs collapsed.
fn extract_text(html: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in html.tree.root().descendants() {
        let Node::Text(text) = node.value() else { continue; };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().map_or(false, |e| matches!(e.name(), "script" | "style"))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
