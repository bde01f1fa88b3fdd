//! Local deterministic embedding provider

use async_trait::async_trait;

use pdfqa_core::{EmbeddingProvider, Error, Result, normalize};

/// English function words, sorted for binary search
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "must", "my", "myself", "no", "nor", "not", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Lowercased content words of `text` with punctuation and stopwords removed
fn terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .filter(|word| STOPWORDS.binary_search(word).is_err())
        .map(|word| match word.strip_suffix('s') {
            Some(stem) if word.len() > 3 && !word.ends_with("ss") => stem.to_string(),
            _ => word.to_string(),
        })
        .collect()
}

/// Feature-hashing embedder that needs no model download or network access
///
/// Content words and their bigrams are hashed into a fixed number of signed
/// buckets and the result is normalized to unit length. Stopwords are dropped
/// and plural `s` is folded, so similarity comes from shared content words and
/// unrelated texts stay near zero. MD5 is used for bucketing so vectors are
/// stable across processes and toolchains once they are stored in a persistent
/// index.
///
/// Scores are lexical and run lower than those of a sentence model; pair it
/// with [`HashingEmbedder::SCORE_THRESHOLD`] rather than a threshold tuned for
/// a neural embedder.
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Standard dimension for sentence embeddings
    pub const DEFAULT_DIMENSION: usize = 384;

    /// Minimum similarity for a chunk to count as supporting evidence
    pub const SCORE_THRESHOLD: f32 = 0.2;

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hashing-{}", dimension),
        })
    }

    /// Bucket index and sign for the primary and secondary slot of a feature
    fn slots(&self, feature: &str) -> [(usize, f32); 2] {
        let digest = md5::compute(feature.as_bytes()).0;
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&digest[..8]);
        high.copy_from_slice(&digest[8..]);
        let low = u64::from_le_bytes(low);
        let high = u64::from_le_bytes(high);
        let dimension = self.dimension as u64;

        let sign = |bits: u64| if bits >> 63 == 0 { 1.0 } else { -1.0 };
        [
            ((low % dimension) as usize, sign(low)),
            ((high % dimension) as usize, sign(high)),
        ]
    }

    /// Embed one text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let words = terms(text);
        let mut embedding = vec![0.0f32; self.dimension];

        for word in &words {
            let [(primary, primary_sign), (secondary, secondary_sign)] = self.slots(word);
            embedding[primary] += primary_sign;

            // Spread longer words over a second bucket to soften collisions
            if word.len() > 3 {
                embedding[secondary] += 0.5 * secondary_sign;
            }
        }

        for window in words.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            let [(idx, sign), _] = self.slots(&bigram);
            embedding[idx] += 0.3 * sign;
        }

        normalize(&mut embedding);
        embedding
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
            model_id: format!("hashing-{}", Self::DEFAULT_DIMENSION),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
