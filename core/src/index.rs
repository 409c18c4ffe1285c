use crate::corpus::Document;
use crate::lexicon::LemmaMap;
use crate::tokenizer::{strip_tags, words};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub type DocId = u32;
pub type DocSet = BTreeSet<DocId>;

/// Token -> ascending, de-duplicated list of the documents containing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<DocId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn from_postings(postings: BTreeMap<String, Vec<DocId>>) -> Self {
        let mut index = Self { postings };
        index.finalize();
        index
    }

    pub fn postings(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, term: &str) -> bool { self.postings.contains_key(term) }

    pub fn document_frequency(&self, term: &str) -> usize { self.postings(term).len() }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.postings.keys().map(String::as_str) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.postings.iter().map(|(t, ids)| (t.as_str(), ids.as_slice()))
    }

    /// Posts `doc_id` under `term` unless it is already there.
    fn post(&mut self, term: &str, doc_id: DocId) {
        let list = self.postings.entry(term.to_string()).or_default();
        if !list.contains(&doc_id) {
            list.push(doc_id);
        }
    }

    fn finalize(&mut self) {
        for list in self.postings.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
    }

    /// Collapses token postings onto lemmas: each lemma posts the union of its forms' documents.
    pub fn aggregate_lemmas(&self, lemmas: &LemmaMap) -> InvertedIndex {
        let mut postings: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
        for (lemma, forms) in lemmas.iter() {
            let mut ids: DocSet = self.postings(lemma).iter().copied().collect();
            for form in forms {
                ids.extend(self.postings(form).iter().copied());
            }
            if !ids.is_empty() {
                postings.insert(lemma.to_string(), ids.into_iter().collect());
            }
        }
        InvertedIndex { postings }
    }
}

/// Builds the index. A non-empty vocabulary selects whole-word matching of every
/// vocabulary token; otherwise each document is tokenized directly.
pub fn build_index(documents: &[Document], vocabulary: &[String]) -> InvertedIndex {
    if vocabulary.is_empty() {
        tracing::info!(num_docs = documents.len(), "no vocabulary, indexing documents directly");
        build_direct(documents)
    } else {
        build_from_vocabulary(documents, vocabulary)
    }
}

pub fn build_from_vocabulary(documents: &[Document], vocabulary: &[String]) -> InvertedIndex {
    let matchers: Vec<(&str, Regex)> = vocabulary
        .iter()
        .filter_map(|token| match Regex::new(&format!(r"\b{}\b", regex::escape(token))) {
            Ok(re) => Some((token.as_str(), re)),
            Err(err) => {
                tracing::warn!(token = %token, %err, "skipping vocabulary token");
                None
            }
        })
        .collect();

    let mut index = InvertedIndex::new();
    for doc in documents {
        let text = strip_tags(&doc.raw).to_lowercase();
        for (token, re) in &matchers {
            if re.is_match(&text) {
                index.post(token, doc.id);
            }
        }
    }
    index.finalize();
    tracing::info!(num_docs = documents.len(), num_terms = index.len(), "built index from vocabulary");
    index
}

pub fn build_direct(documents: &[Document]) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for doc in documents {
        let mut seen: HashSet<String> = HashSet::new();
        for word in words(&doc.raw) {
            if seen.insert(word.clone()) {
                index.post(&word, doc.id);
            }
        }
    }
    index.finalize();
    tracing::info!(num_docs = documents.len(), num_terms = index.len(), "built index directly");
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, raw: &str) -> Document {
        Document { id, raw: raw.to_string(), title: String::new(), text: String::new() }
    }

    #[test]
    fn vocabulary_mode_matches_whole_words_only() {
        let docs = vec![
            doc(3, "<p>Python rocks</p>"),
            doc(1, "<b>pythonic</b> code"),
            doc(2, "python, python again"),
        ];
        let vocab = vec!["python".to_string(), "code".to_string()];
        let index = build_index(&docs, &vocab);
        assert_eq!(index.postings("python"), &[2, 3]);
        assert_eq!(index.postings("code"), &[1]);
        assert_eq!(index.document_frequency("missing"), 0);
    }

    #[test]
    fn tags_do_not_produce_matches() {
        let docs = vec![doc(1, "<python>text</python>")];
        let index = build_from_vocabulary(&docs, &["python".to_string()]);
        assert!(index.postings("python").is_empty());
    }

    #[test]
    fn direct_mode_discovers_vocabulary_without_duplicates() {
        let docs = vec![doc(2, "Rust rust RUST"), doc(1, "<i>rust</i> and go4 go")];
        let index = build_index(&docs, &[]);
        assert_eq!(index.postings("rust"), &[1, 2]);
        assert_eq!(index.postings("go"), &[1]);
        assert!(!index.contains("go4"));
        assert!(!index.contains("i"));
    }

    #[test]
    fn lemma_aggregation_unions_forms() {
        let mut postings = BTreeMap::new();
        postings.insert("run".to_string(), vec![1]);
        postings.insert("running".to_string(), vec![2, 3]);
        postings.insert("ran".to_string(), vec![3]);
        let index = InvertedIndex::from_postings(postings);
        let lemmas = LemmaMap::parse("run: running ran\nwalk: walked\n");
        let agg = index.aggregate_lemmas(&lemmas);
        assert_eq!(agg.postings("run"), &[1, 2, 3]);
        assert!(!agg.contains("walk"));
    }
}
