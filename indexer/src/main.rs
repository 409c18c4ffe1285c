use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use search_core::boolean::sorted_ids;
use search_core::corpus::{load_corpus, page_file_name, Corpus};
use search_core::lexicon::{load_vocabulary, LemmaMap};
use search_core::persist::{load_index, load_meta, save_index, save_meta, save_weights, IndexPaths, MetaFile};
use search_core::{build_index, BooleanEngine, DocSet, InvertedIndex, WeightingEngine};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index and tf-idf weights, and run boolean queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CorpusArgs {
    /// Directory holding page_NNN.html files
    #[arg(long, default_value = "data/pages")]
    pages: String,
    /// Token vocabulary, one token per line
    #[arg(long, default_value = "data/tokens.txt")]
    tokens: String,
    /// Lemma map, `lemma: form1 form2` per line
    #[arg(long, default_value = "data/lemmas.txt")]
    lemmas: String,
    /// Output directory for the index, metadata and weight files
    #[arg(long, default_value = "data/index")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index (falls back to direct tokenization without a vocabulary)
    BuildIndex(CorpusArgs),
    /// Compute per-document tf-idf weights from an existing index
    Weights(CorpusArgs),
    /// Build the index, then compute weights
    All(CorpusArgs),
    /// Evaluate a boolean query (AND, OR, NOT, parentheses) against the index
    Query {
        /// Directory holding page_NNN.html files
        #[arg(long, default_value = "data/pages")]
        pages: String,
        /// Directory holding inverted_index.json
        #[arg(long, default_value = "data/index")]
        index: String,
        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        query: String,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    total_hits: usize,
    ids: Vec<u32>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildIndex(args) => {
            let corpus = load_corpus(&args.pages)?;
            build(&args, &corpus).map(|_| ())
        }
        Commands::Weights(args) => {
            let corpus = load_corpus(&args.pages)?;
            let paths = IndexPaths::new(&args.output);
            let index = load_index(&paths)?;
            match load_meta(&paths) {
                Ok(meta) if meta.num_docs as usize != corpus.len() => tracing::warn!(
                    indexed = meta.num_docs,
                    corpus = corpus.len(),
                    "corpus changed since the index was built, rebuild with `all`"
                ),
                Ok(_) => {}
                Err(err) => tracing::debug!(%err, "no index metadata"),
            }
            weigh(&args, &corpus, &index)
        }
        Commands::All(args) => {
            let corpus = load_corpus(&args.pages)?;
            let index = build(&args, &corpus)?;
            weigh(&args, &corpus, &index)
        }
        Commands::Query { pages, index, json, query } => run_query(&pages, &index, &query, json),
    }
}

fn build(args: &CorpusArgs, corpus: &Corpus) -> Result<InvertedIndex> {
    let paths = IndexPaths::new(&args.output);
    let vocabulary = load_vocabulary(&args.tokens);
    let index = build_index(&corpus.documents, &vocabulary);
    save_index(&paths, &index).context("saving inverted index")?;

    let meta = MetaFile {
        num_docs: corpus.len() as u32,
        num_terms: index.len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: 1,
    };
    save_meta(&paths, &meta)?;
    tracing::info!(output = %paths.inverted_index().display(), num_terms = index.len(), "index build complete");
    Ok(index)
}

fn weigh(args: &CorpusArgs, corpus: &Corpus, index: &InvertedIndex) -> Result<()> {
    let paths = IndexPaths::new(&args.output);
    let vocabulary = load_vocabulary(&args.tokens);
    let lemmas = LemmaMap::load(&args.lemmas);
    let engine = WeightingEngine::new(index, &vocabulary, &lemmas, corpus.len());

    save_weights(&paths, &engine.weigh_all(&corpus.documents)).context("saving weights")?;
    tracing::info!(output = %paths.weights_dir().display(), failed = corpus.failed, "weights complete");
    Ok(())
}

fn run_query(pages: &str, index_dir: &str, query: &str, json: bool) -> Result<()> {
    let corpus = load_corpus(pages)?;
    let index = load_index(&IndexPaths::new(index_dir))?;
    let universe: DocSet = corpus.ids().collect();
    let result = BooleanEngine::new(&index, &universe).evaluate(query).context("query evaluation failed")?;
    let ids = sorted_ids(&result);

    if json {
        let out = QueryOutput { query, total_hits: ids.len(), ids };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if ids.is_empty() {
        println!("no documents found");
    } else {
        println!("found {} documents", ids.len());
        for id in ids {
            println!("{}", page_file_name(id));
        }
    }
    Ok(())
}
