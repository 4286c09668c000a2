//! Cache-or-search retrieval for a single query.

use tracing::{debug, warn};

use docqa_corpus::Chunk;
use docqa_embeddings::{EmbeddingProvider, SemanticCache};

use crate::error::Result;
use crate::snapshot::CorpusSnapshot;

/// Chunks retrieved for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub chunks: Vec<Chunk>,

    /// Whether the chunks came from the semantic cache.
    pub from_cache: bool,
}

/// Retrieve the chunks for `query`.
///
/// The query is embedded once. A cache hit with a non-empty result is
/// returned as is and the index is not searched. Otherwise the index is
/// searched for `top_k` chunks (clamped to the corpus size) and a non-empty
/// result is added to the cache. A failed cache write is logged and does not
/// fail the query.
pub async fn retrieve(
    provider: &dyn EmbeddingProvider,
    cache: &SemanticCache<Vec<Chunk>>,
    snapshot: &CorpusSnapshot,
    query: &str,
    top_k: usize,
) -> Result<Retrieval> {
    let embedding = provider.encode_one(query).await?;

    if let Some(chunks) = cache.lookup(&embedding).await {
        if !chunks.is_empty() {
            debug!("Using {} cached chunks", chunks.len());
            return Ok(Retrieval {
                chunks,
                from_cache: true,
            });
        }
    }

    let chunks = snapshot.search(&embedding, top_k)?;
    debug!("Index returned {} chunks", chunks.len());
    if !chunks.is_empty() {
        if let Err(err) = cache.insert(query, embedding, chunks.clone()).await {
            warn!("Could not cache retrieval for \"{query}\": {err}");
        }
    }

    Ok(Retrieval {
        chunks,
        from_cache: false,
    })
}
