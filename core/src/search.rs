use crate::boolean::{BooleanEngine, QueryError};
use crate::corpus::{load_corpus, Corpus, Document};
use crate::lexicon::LemmaMap;
use crate::persist::{load_index, load_meta, load_weights, IndexPaths};
use crate::tokenizer::query_terms;
use crate::weights::{idf, tf, WeightKind};
use crate::{DocId, DocSet, InvertedIndex};
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub const DEFAULT_TOP_N: usize = 10;
/// Weight factor for query terms the index has never seen.
const UNSEEN_TERM_WEIGHT: f64 = 0.1;
const SNIPPET_LEN: usize = 200;
const SNIPPET_LOOKBEHIND: usize = 50;
const SENTENCE_SLACK: usize = 30;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: DocId,
    pub score: f64,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pages_dir: PathBuf,
    pub lemmas: PathBuf,
    pub index_dir: PathBuf,
    pub weight_kind: WeightKind,
}

/// Unit-length query weights; empty when the query carries no weight at all.
#[derive(Debug, Clone, Default)]
pub struct QueryVector {
    weights: HashMap<String, f64>,
}

impl QueryVector {
    pub fn get(&self, term: &str) -> f64 { self.weights.get(term).copied().unwrap_or(0.0) }
    pub fn is_empty(&self) -> bool { self.weights.is_empty() }
    pub fn len(&self) -> usize { self.weights.len() }
    pub fn norm(&self) -> f64 { self.weights.values().map(|w| w * w).sum::<f64>().sqrt() }
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> { self.weights.iter().map(|(t, w)| (t.as_str(), *w)) }
}

#[derive(Debug, Clone)]
struct DocVector {
    weights: HashMap<String, f64>,
    norm: f64,
}

impl DocVector {
    fn new(weights: HashMap<String, f64>) -> Self {
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    /// Dot product over the document norm only; the query side is already unit length.
    fn similarity(&self, query: &QueryVector) -> f64 {
        if self.norm == 0.0 { return 0.0; }
        let dot: f64 = query.iter().map(|(t, w)| w * self.weights.get(t).copied().unwrap_or(0.0)).sum();
        dot / self.norm
    }
}

/// Read-only search service built once at startup and shared by reference.
pub struct SearchEngine {
    documents: BTreeMap<DocId, Document>,
    universe: DocSet,
    index: InvertedIndex,
    lemma_index: InvertedIndex,
    lemmas: LemmaMap,
    vectors: BTreeMap<DocId, DocVector>,
    weight_kind: WeightKind,
}

impl SearchEngine {
    pub fn new(
        corpus: Corpus,
        index: InvertedIndex,
        lemmas: LemmaMap,
        vectors: BTreeMap<DocId, HashMap<String, f64>>,
        weight_kind: WeightKind,
    ) -> Self {
        let documents: BTreeMap<DocId, Document> = corpus.documents.into_iter().map(|d| (d.id, d)).collect();
        let universe = documents.keys().copied().collect();
        let lemma_index = index.aggregate_lemmas(&lemmas);
        let vectors = vectors
            .into_iter()
            .filter(|(id, _)| {
                let known = documents.contains_key(id);
                if !known {
                    tracing::warn!(id, "weight vector for a document outside the corpus, ignoring");
                }
                known
            })
            .map(|(id, w)| (id, DocVector::new(w)))
            .collect();
        Self { documents, universe, index, lemma_index, lemmas, vectors, weight_kind }
    }

    /// Blocking load of every artifact. A missing corpus or index is an error;
    /// missing lemmas or weights degrade to empty.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let corpus = load_corpus(&config.pages_dir)?;
        let paths = IndexPaths::new(&config.index_dir);
        let index = load_index(&paths)?;
        match load_meta(&paths) {
            Ok(meta) => tracing::info!(created_at = %meta.created_at, num_docs = meta.num_docs, "index metadata"),
            Err(err) => tracing::debug!(%err, "no index metadata"),
        }
        let lemmas = LemmaMap::load(&config.lemmas);
        let vectors = load_weights(&paths, config.weight_kind)?;
        Ok(Self::new(corpus, index, lemmas, vectors, config.weight_kind))
    }

    pub fn num_documents(&self) -> usize { self.documents.len() }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.documents.get(&id) }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn universe(&self) -> &DocSet { &self.universe }

    pub fn boolean(&self, query: &str) -> Result<DocSet, QueryError> {
        BooleanEngine::new(&self.index, &self.universe).evaluate(query)
    }

    fn idf_index(&self) -> &InvertedIndex {
        match self.weight_kind {
            WeightKind::Tokens => &self.index,
            WeightKind::Lemmas => &self.lemma_index,
        }
    }

    pub fn query_vector<S: AsRef<str>>(&self, terms: &[S]) -> QueryVector {
        if terms.is_empty() { return QueryVector::default(); }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for t in terms {
            *counts.entry(t.as_ref()).or_insert(0) += 1;
        }
        let index = self.idf_index();
        let n = self.num_documents();
        let mut weights: HashMap<String, f64> = counts
            .into_iter()
            .map(|(term, count)| {
                let tf = tf(count, terms.len());
                let df = index.document_frequency(term);
                let w = if df > 0 { tf * idf(n, df) } else { tf * UNSEEN_TERM_WEIGHT };
                (term.to_string(), w)
            })
            .collect();
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm == 0.0 { return QueryVector::default(); }
        for w in weights.values_mut() {
            *w /= norm;
        }
        QueryVector { weights }
    }

    /// Every document with positive similarity, best first, ties by ascending id.
    pub fn rank(&self, query: &QueryVector) -> Vec<(DocId, f64)> {
        let mut scored: Vec<(DocId, f64)> = self
            .vectors
            .iter()
            .map(|(id, v)| (*id, v.similarity(query)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        scored
    }

    pub fn search(&self, query: &str, top_n: usize) -> Vec<SearchHit> { self.search_counted(query, top_n).1 }

    /// Like [`search`](Self::search), also returning how many documents matched before truncation.
    pub fn search_counted(&self, query: &str, top_n: usize) -> (usize, Vec<SearchHit>) {
        let raw_terms = query_terms(query);
        if raw_terms.is_empty() { return (0, Vec::new()); }
        let lemmatized: Vec<&str> = raw_terms.iter().map(|t| self.lemmas.lemmatize(t)).collect();
        let qv = self.query_vector(&lemmatized);
        if qv.is_empty() { return (0, Vec::new()); }

        let scored = self.rank(&qv);
        let total = scored.len();
        tracing::debug!(query, terms = qv.len(), total, "ranked documents");
        let hits = scored.into_iter().take(top_n).map(|(id, score)| self.hit(id, score, &raw_terms)).collect();
        (total, hits)
    }

    fn hit(&self, id: DocId, score: f64, raw_terms: &[String]) -> SearchHit {
        match self.documents.get(&id) {
            Some(doc) => SearchHit { id, score, title: doc.title.clone(), snippet: snippet(&doc.text, raw_terms) },
            None => SearchHit { id, score, title: format!("Document {id}"), snippet: String::new() },
        }
    }
}

fn fold(c: char) -> char { c.to_lowercase().next().unwrap_or(c) }

fn is_sentence_boundary(c: char) -> bool { matches!(c, '.' | '!' | '?' | '\n') }

/// Excerpt around the earliest case-insensitive occurrence of any term, trimmed to
/// sentence boundaries. Offsets count characters.
pub fn snippet<S: AsRef<str>>(text: &str, terms: &[S]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();

    let first = terms
        .iter()
        .map(|t| t.as_ref().chars().map(fold).collect::<Vec<char>>())
        .filter(|needle| !needle.is_empty() && needle.len() <= folded.len())
        .filter_map(|needle| folded.windows(needle.len()).position(|w| w == needle.as_slice()))
        .min();

    let start = match first {
        None => 0,
        Some(pos) => {
            let mut s = pos.saturating_sub(SNIPPET_LOOKBEHIND);
            while s > 0 && !is_sentence_boundary(chars[s]) {
                s -= 1;
            }
            if s > 0 { s + 1 } else { 0 }
        }
    };

    let mut end = (start + SNIPPET_LEN).min(chars.len());
    if end < chars.len() {
        if let Some(off) = chars[end..].iter().position(|&c| c == '.') {
            if off < SENTENCE_SLACK {
                end += off + 1;
            }
        }
    }

    let body: String = chars[start..end].iter().collect();
    let mut out = String::new();
    if start > 0 { out.push_str("..."); }
    out.push_str(body.trim());
    if end < chars.len() { out.push_str("..."); }
    out
}
