use crate::corpus::Document;
use crate::lexicon::LemmaMap;
use crate::tokenizer::text_tokens;
use crate::{DocId, InvertedIndex};
use std::collections::HashMap;

/// Which vocabulary a weight vector is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightKind {
    Tokens,
    Lemmas,
}

impl WeightKind {
    pub fn prefix(self) -> &'static str {
        match self {
            WeightKind::Tokens => "tokens_tf_idf_",
            WeightKind::Lemmas => "lemmas_tf_idf_",
        }
    }

    pub fn file_name(self, doc_id: DocId) -> String { format!("{}{doc_id}.txt", self.prefix()) }

    /// `tokens_tf_idf_12.txt` -> 12 for the matching kind.
    pub fn doc_id_from_file_name(self, name: &str) -> Option<DocId> {
        name.strip_prefix(self.prefix())?.strip_suffix(".txt")?.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermWeight {
    pub term: String,
    pub idf: f64,
    pub tfidf: f64,
}

/// Both weight vectors of one document, each sorted by descending tf-idf.
#[derive(Debug, Clone, Default)]
pub struct DocumentWeights {
    pub doc_id: DocId,
    pub tokens: Vec<TermWeight>,
    pub lemmas: Vec<TermWeight>,
}

impl DocumentWeights {
    pub fn get(&self, kind: WeightKind) -> &[TermWeight] {
        match kind {
            WeightKind::Tokens => &self.tokens,
            WeightKind::Lemmas => &self.lemmas,
        }
    }
}

pub fn tf(occurrences: usize, total_tokens: usize) -> f64 {
    if total_tokens == 0 { 0.0 } else { occurrences as f64 / total_tokens as f64 }
}

/// Zero when the term is unseen, and never negative when an index outlives a shrunk corpus.
pub fn idf(total_documents: usize, document_frequency: usize) -> f64 {
    if document_frequency == 0 || total_documents == 0 { 0.0 } else { (total_documents as f64 / document_frequency as f64).log10().max(0.0) }
}

/// Computes tf-idf vectors against a fixed index snapshot.
pub struct WeightingEngine<'a> {
    token_index: &'a InvertedIndex,
    lemma_index: InvertedIndex,
    vocabulary: Vec<String>,
    lemmas: &'a LemmaMap,
    total_documents: usize,
}

impl<'a> WeightingEngine<'a> {
    /// An empty `vocabulary` falls back to the index's own term order.
    pub fn new(token_index: &'a InvertedIndex, vocabulary: &[String], lemmas: &'a LemmaMap, total_documents: usize) -> Self {
        let vocabulary = if vocabulary.is_empty() {
            token_index.terms().map(str::to_string).collect()
        } else {
            vocabulary.to_vec()
        };
        Self { token_index, lemma_index: token_index.aggregate_lemmas(lemmas), vocabulary, lemmas, total_documents }
    }

    pub fn lemma_index(&self) -> &InvertedIndex { &self.lemma_index }

    pub fn weigh(&self, doc: &Document) -> DocumentWeights {
        let tokens = text_tokens(&doc.text);
        let total = tokens.len();
        let mut token_counts: HashMap<&str, usize> = HashMap::new();
        for t in &tokens {
            *token_counts.entry(t.as_str()).or_insert(0) += 1;
        }
        let mut lemma_counts: HashMap<&str, usize> = HashMap::new();
        for (token, count) in &token_counts {
            if let Some(lemma) = self.lemmas.lemma_of(token) {
                *lemma_counts.entry(lemma).or_insert(0) += count;
            }
        }

        let tokens = score(self.vocabulary.iter().map(String::as_str), &token_counts, total, self.token_index, self.total_documents);
        let lemmas = score(self.lemmas.iter().map(|(l, _)| l), &lemma_counts, total, &self.lemma_index, self.total_documents);
        DocumentWeights { doc_id: doc.id, tokens, lemmas }
    }

    pub fn weigh_all(&self, documents: &[Document]) -> Vec<DocumentWeights> {
        let out: Vec<DocumentWeights> = documents.iter().map(|d| self.weigh(d)).collect();
        tracing::info!(num_docs = out.len(), vocabulary = self.vocabulary.len(), lemmas = self.lemmas.len(), "computed tf-idf weights");
        out
    }
}

/// Weights for the terms present in the document, in `order`, then stably sorted by weight.
fn score<'t>(
    order: impl Iterator<Item = &'t str>,
    counts: &HashMap<&str, usize>,
    total_tokens: usize,
    index: &InvertedIndex,
    total_documents: usize,
) -> Vec<TermWeight> {
    let mut out: Vec<TermWeight> = order
        .filter_map(|term| {
            let count = *counts.get(term)?;
            let idf = idf(total_documents, index.document_frequency(term));
            Some(TermWeight { term: term.to_string(), idf, tfidf: tf(count, total_tokens) * idf })
        })
        .collect();
    out.sort_by(|a, b| b.tfidf.partial_cmp(&a.tfidf).unwrap_or(std::cmp::Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn doc(id: DocId, text: &str) -> Document {
        Document { id, raw: String::new(), title: String::new(), text: text.to_string() }
    }

    #[test]
    fn tf_and_idf_edge_cases() {
        assert_eq!(tf(3, 0), 0.0);
        assert_eq!(tf(1, 4), 0.25);
        assert_eq!(idf(10, 0), 0.0);
        assert!((idf(100, 10) - 1.0).abs() < 1e-12);
        assert_eq!(idf(5, 5), 0.0);
        assert_eq!(idf(2, 3), 0.0);
    }

    #[test]
    fn stale_index_never_yields_negative_weights() {
        let mut postings = BTreeMap::new();
        postings.insert("rust".to_string(), vec![1, 2, 3]);
        let index = InvertedIndex::from_postings(postings);
        let lemmas = LemmaMap::default();
        let w = WeightingEngine::new(&index, &[], &lemmas, 2).weigh(&doc(1, "rust rust"));
        assert!(w.tokens.iter().all(|t| t.idf >= 0.0 && t.tfidf >= 0.0));
    }

    #[test]
    fn weighs_only_present_terms_sorted_by_weight() {
        let mut postings = BTreeMap::new();
        postings.insert("rare".to_string(), vec![1]);
        postings.insert("common".to_string(), vec![1, 2]);
        postings.insert("absent".to_string(), vec![2]);
        let index = InvertedIndex::from_postings(postings);
        let lemmas = LemmaMap::default();
        let vocab = vec!["common".to_string(), "rare".to_string(), "absent".to_string()];
        let engine = WeightingEngine::new(&index, &vocab, &lemmas, 4);

        let w = engine.weigh(&doc(1, "Common rare filler filler"));
        let terms: Vec<&str> = w.tokens.iter().map(|t| t.term.as_str()).collect();
        // equal tf, so the rarer term ranks first
        assert_eq!(terms, vec!["rare", "common"]);
        assert!((w.tokens[0].tfidf - 0.25 * 4f64.log10()).abs() < 1e-12);
        assert!((w.tokens[1].idf - 2f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_vocabulary_order() {
        let mut postings = BTreeMap::new();
        postings.insert("beta".to_string(), vec![1]);
        postings.insert("alpha".to_string(), vec![1]);
        let index = InvertedIndex::from_postings(postings);
        let lemmas = LemmaMap::default();
        let vocab = vec!["beta".to_string(), "alpha".to_string()];
        let w = WeightingEngine::new(&index, &vocab, &lemmas, 2).weigh(&doc(1, "alpha beta"));
        let terms: Vec<&str> = w.tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["beta", "alpha"]);
    }

    #[test]
    fn lemma_counts_sum_forms() {
        let mut postings = BTreeMap::new();
        postings.insert("run".to_string(), vec![1]);
        postings.insert("running".to_string(), vec![1]);
        let index = InvertedIndex::from_postings(postings);
        let lemmas = LemmaMap::parse("run: running\n");
        let engine = WeightingEngine::new(&index, &[], &lemmas, 3);
        let w = engine.weigh(&doc(1, "run running walk running"));
        assert_eq!(w.lemmas.len(), 1);
        assert_eq!(w.lemmas[0].term, "run");
        assert!((w.lemmas[0].tfidf - 0.75 * 3f64.log10()).abs() < 1e-12);
        assert_eq!(engine.lemma_index().postings("run"), &[1]);
    }

    #[test]
    fn empty_document_has_no_weights() {
        let index = InvertedIndex::new();
        let lemmas = LemmaMap::default();
        let w = WeightingEngine::new(&index, &["x".to_string()], &lemmas, 1).weigh(&doc(9, ""));
        assert!(w.tokens.is_empty() && w.lemmas.is_empty());
    }
}
