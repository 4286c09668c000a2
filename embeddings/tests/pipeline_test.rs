//! Provider, index and semantic cache working together.

use docqa_embeddings::{
    EmbeddingProvider, HashingProvider, IndexConfig, IndexKind, SemanticCache,
    SemanticCacheConfig, VectorIndex, euclidean_distance,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn memos(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("memo {i} covers region {} and quarter {}", i % 7, i % 4))
        .collect()
}

#[tokio::test]
async fn test_ivf_index_over_embedded_corpus_finds_each_memo() {
    let provider = HashingProvider::new(256);
    let texts = memos(150);
    let embeddings = provider.encode(&texts).await.unwrap();

    let index = VectorIndex::build(provider.dimension(), embeddings.clone(), &IndexConfig::default())
        .unwrap();
    assert_eq!(index.kind(), IndexKind::Ivf);
    assert_eq!(index.cluster_total(), 12);

    for position in [0, 41, 99, 149] {
        let hits = index.search(&embeddings[position], 10).unwrap();
        assert_eq!(hits.len(), 10);
        assert_eq!(hits[0].position, position);
        assert_eq!(hits[0].distance, 0.0);
    }
}

#[tokio::test]
async fn test_flat_index_matches_brute_force() {
    let provider = HashingProvider::new(256);
    let texts = memos(40);
    let embeddings = provider.encode(&texts).await.unwrap();
    let index = VectorIndex::build(provider.dimension(), embeddings.clone(), &IndexConfig::default())
        .unwrap();
    assert_eq!(index.kind(), IndexKind::Flat);

    let query = provider.encode_one("region 3 quarter 1").await.unwrap();
    let hits = index.search(&query, 5).unwrap();

    let mut expected: Vec<(f32, usize)> = embeddings
        .iter()
        .enumerate()
        .map(|(i, e)| (euclidean_distance(e, &query).unwrap(), i))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let got: Vec<usize> = hits.iter().map(|h| h.position).collect();
    let want: Vec<usize> = expected.iter().take(5).map(|(_, i)| *i).collect();
    assert_eq!(got, want);
}

#[tokio::test]
async fn test_cache_threshold_around_stored_embedding() {
    let temp_dir = TempDir::new().unwrap();
    let config = SemanticCacheConfig::default().with_path(temp_dir.path().join("cache.json"));
    let provider = HashingProvider::new(8);
    let cache = SemanticCache::open(config, provider.identity()).await.unwrap();

    let v = vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0];
    cache
        .insert("what is new", v.clone(), vec!["chunk".to_string()])
        .await
        .unwrap();

    let mut near = v.clone();
    near[4] += 0.3;
    near[5] -= 0.3;
    assert!(euclidean_distance(&v, &near).unwrap() < 0.5);
    assert_eq!(cache.lookup(&near).await, Some(vec!["chunk".to_string()]));

    let mut far = v.clone();
    far[4] += 0.4;
    far[5] -= 0.4;
    assert!(euclidean_distance(&v, &far).unwrap() > 0.5);
    assert_eq!(cache.lookup(&far).await, None);
}
