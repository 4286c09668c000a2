//! Prompt assembly and source attribution.

use indexmap::IndexMap;
use serde::Serialize;

use docqa_corpus::{Chunk, ChunkSourceMap};
use docqa_generation::GenerationClient;

use crate::error::Result;

/// Bucket for chunks whose document is not in the source map.
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// A generated answer and the chunks it was grounded on, grouped by document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,

    /// Document name to chunk texts, in first-seen order.
    pub sources: IndexMap<String, Vec<String>>,

    /// Whether retrieval was served by the semantic cache.
    pub from_cache: bool,
}

/// Build the generation prompt from the retrieved chunks.
pub fn build_prompt(query: &str, chunks: &[Chunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following context, please answer the question. \
         If the answer is not fully contained in the context, provide the most relevant \
         information available and indicate any uncertainty.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer:"
    )
}

/// Group chunk texts by the document the source map assigns them to.
pub fn attribute_sources(chunks: &[Chunk], source_map: &ChunkSourceMap) -> IndexMap<String, Vec<String>> {
    let mut sources: IndexMap<String, Vec<String>> = IndexMap::new();
    for chunk in chunks {
        let document = source_map.get(&chunk.text).unwrap_or(UNKNOWN_SOURCE);
        sources
            .entry(document.to_string())
            .or_default()
            .push(chunk.text.clone());
    }
    sources
}

/// Generate an answer for `query` from already retrieved chunks.
pub async fn compose_answer(
    generator: &GenerationClient,
    query: &str,
    chunks: &[Chunk],
    source_map: &ChunkSourceMap,
    from_cache: bool,
) -> Result<Answer> {
    let prompt = build_prompt(query, chunks);
    let text = generator.generate(&prompt).await?;
    Ok(Answer {
        text,
        sources: attribute_sources(chunks, source_map),
        from_cache,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_layout() {
        let chunks = vec![Chunk::new("first", "a.txt"), Chunk::new("second", "b.txt")];
        let prompt = build_prompt("What is new?", &chunks);

        assert!(prompt.starts_with("Based on the following context, please answer the question."));
        assert!(prompt.contains("indicate any uncertainty."));
        assert!(prompt.contains("Context:\nfirst\nsecond\n\nQuestion: What is new?\n\nAnswer:"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_sources_grouped_in_first_seen_order() {
        let chunks = vec![
            Chunk::new("b1", "b.txt"),
            Chunk::new("a1", "a.txt"),
            Chunk::new("b2", "b.txt"),
            Chunk::new("orphan", "gone.txt"),
        ];
        let source_map: ChunkSourceMap = chunks[..3].iter().cloned().collect();

        let sources = attribute_sources(&chunks, &source_map);
        let keys: Vec<&str> = sources.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b.txt", "a.txt", UNKNOWN_SOURCE]);
        assert_eq!(sources["b.txt"], vec!["b1".to_string(), "b2".to_string()]);
        assert_eq!(sources[UNKNOWN_SOURCE], vec!["orphan".to_string()]);
    }
}
