//! Document retrieval over a fixed corpus: inverted index, boolean queries,
//! tf-idf weighting and cosine-ranked free-text search.

pub mod boolean;
pub mod corpus;
pub mod index;
pub mod lexicon;
pub mod persist;
pub mod search;
pub mod tokenizer;
pub mod weights;

pub use boolean::{BooleanEngine, QueryError};
pub use corpus::{Corpus, Document};
pub use index::{build_index, DocId, DocSet, InvertedIndex};
pub use lexicon::LemmaMap;
pub use search::{EngineConfig, SearchEngine, SearchHit, DEFAULT_TOP_N};
pub use weights::{DocumentWeights, TermWeight, WeightKind, WeightingEngine};
