//! Rebuilding an unchanged corpus yields the same chunks and search results.

use std::fs;

use docqa_corpus::{Chunk, ChunkStore, CorpusConfig};
use docqa_embeddings::{
    EmbeddingProvider, HashingProvider, IndexConfig, IndexKind, SearchHit, VectorIndex,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn build_and_search(
    store: &ChunkStore,
    corpus: &TempDir,
    provider: &HashingProvider,
    queries: &[&str],
) -> (Vec<Chunk>, IndexKind, Vec<Vec<SearchHit>>) {
    let set = store.build(corpus.path()).unwrap();
    let embeddings = provider.encode(&set.texts()).await.unwrap();
    let index =
        VectorIndex::build(provider.dimension(), embeddings, &IndexConfig::default()).unwrap();

    let mut results = Vec::new();
    for query in queries {
        let embedding = provider.encode_one(query).await.unwrap();
        results.push(index.search(&embedding, 5).unwrap());
    }
    (set.chunks, index.kind(), results)
}

#[tokio::test]
async fn test_flat_rebuild_is_idempotent() {
    let corpus = TempDir::new().unwrap();
    fs::write(corpus.path().join("sales.txt"), "Bonanza sale in August.").unwrap();
    fs::write(corpus.path().join("it.txt"), "UltraFiber network upgrade.").unwrap();
    let store = ChunkStore::new(CorpusConfig::default()).unwrap();
    let provider = HashingProvider::new(256);
    let queries = ["network upgrade", "August sale"];

    let first = build_and_search(&store, &corpus, &provider, &queries).await;
    let second = build_and_search(&store, &corpus, &provider, &queries).await;

    assert_eq!(first.1, IndexKind::Flat);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_ivf_rebuild_is_idempotent() {
    let corpus = TempDir::new().unwrap();
    for i in 0..120 {
        fs::write(
            corpus.path().join(format!("memo-{i:03}.txt")),
            format!("memo {i} covers region {} and quarter {}", i % 7, i % 4),
        )
        .unwrap();
    }
    let store = ChunkStore::new(CorpusConfig::default().with_window(100, 20)).unwrap();
    let provider = HashingProvider::new(256);
    let queries = ["region 3 quarter 1", "memo 42", "quarter 2"];

    let first = build_and_search(&store, &corpus, &provider, &queries).await;
    let second = build_and_search(&store, &corpus, &provider, &queries).await;

    assert_eq!(first.0.len(), 120);
    assert_eq!(first.1, IndexKind::Ivf);
    assert_eq!(first, second);
    assert!(first.2.iter().all(|hits| hits.len() == 5));
}
