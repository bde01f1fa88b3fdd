//! Vector index implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointStruct, QueryPointsBuilder,
    ScoredPoint, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use tracing::{debug, info};

use pdfqa_core::{Chunk, Error, IndexEntry, IndexHit, Result, VectorIndex, cosine_similarity};

#[derive(Default)]
struct FlatState {
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

/// Flat in-memory index with exact cosine search
///
/// Entries keep their first insertion position, so an upsert of an existing id
/// replaces it in place and ties in similarity resolve by insertion order.
pub struct LocalVectorIndex {
    state: Arc<RwLock<FlatState>>,
}

impl LocalVectorIndex {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(FlatState::default())),
        }
    }

    /// Get a stored entry by id
    #[cfg(test)]
    pub fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        let state = self
            .state
            .read()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;
        Ok(state
            .positions
            .get(id)
            .map(|&position| state.entries[position].clone()))
    }
}

impl Default for LocalVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;

        let expected = state
            .entries
            .first()
            .or_else(|| entries.first())
            .map(|e| e.vector.len());
        if let Some(dimension) = expected {
            if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimension) {
                return Err(Error::VectorIndex(format!(
                    "vector dimension {} does not match index dimension {}",
                    bad.vector.len(),
                    dimension
                )));
            }
        }

        for entry in entries {
            match state.positions.get(&entry.id).copied() {
                Some(position) => state.entries[position] = entry,
                None => {
                    let position = state.entries.len();
                    state.positions.insert(entry.id.clone(), position);
                    state.entries.push(entry);
                }
            }
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        let state = self
            .state
            .read()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;

        if let Some(first) = state.entries.first() {
            if first.vector.len() != vector.len() {
                return Err(Error::VectorIndex(format!(
                    "query dimension {} does not match index dimension {}",
                    vector.len(),
                    first.vector.len()
                )));
            }
        }

        let mut scored: Vec<(f32, &IndexEntry)> = state
            .entries
            .iter()
            .map(|entry| (cosine_similarity(vector, &entry.vector), entry))
            .collect();

        // sort_by is stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| IndexHit {
                id: entry.id.clone(),
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;
        state.entries.clear();
        state.positions.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;
        Ok(state.entries.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

const PAYLOAD_CHUNK_ID: &str = "chunk_id";
const PAYLOAD_TEXT: &str = "text";
const PAYLOAD_FILE: &str = "file";
const PAYLOAD_PAGE: &str = "page";

/// Configuration for connecting to a Qdrant instance
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL (e.g., "http://localhost:6334")
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub vector_dimension: u64,
}

/// Persistent index backed by a Qdrant collection
///
/// Chunk ids are UUIDs, so they are used directly as point ids. Text, file and
/// page travel in the point payload.
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection_name: String,
    vector_dimension: u64,
    collection_lock: tokio::sync::RwLock<()>,
}

fn payload_str<'a>(point: &'a ScoredPoint, key: &str) -> Option<&'a str> {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn payload_int(point: &ScoredPoint, key: &str) -> Option<i64> {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => Some(*i),
        _ => None,
    }
}

impl QdrantVectorIndex {
    /// Connect and create the collection if it does not exist yet
    pub async fn connect(config: QdrantConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }
        let client = builder
            .build()
            .map_err(|e| Error::VectorIndex(format!("Qdrant connection failed: {}", e)))?;

        let index = Self {
            client,
            collection_name: config.collection_name,
            vector_dimension: config.vector_dimension,
            collection_lock: tokio::sync::RwLock::new(()),
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .map_err(|e| Error::VectorIndex(format!("Qdrant collection check failed: {}", e)))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                        VectorParamsBuilder::new(self.vector_dimension, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    Error::VectorIndex(format!(
                        "Failed to create Qdrant collection '{}': {}",
                        self.collection_name, e
                    ))
                })?;
            info!(collection = %self.collection_name, "created Qdrant collection");
        }

        Ok(())
    }

    fn entry_to_point(entry: &IndexEntry) -> PointStruct {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(PAYLOAD_CHUNK_ID.to_string(), entry.id.clone().into());
        payload.insert(PAYLOAD_TEXT.to_string(), entry.chunk.text.clone().into());
        payload.insert(PAYLOAD_FILE.to_string(), entry.chunk.file.clone().into());
        payload.insert(PAYLOAD_PAGE.to_string(), i64::from(entry.chunk.page).into());

        PointStruct::new(entry.id.clone(), entry.vector.clone(), payload)
    }

    fn point_to_hit(point: &ScoredPoint) -> Result<IndexHit> {
        let id = payload_str(point, PAYLOAD_CHUNK_ID)
            .ok_or_else(|| Error::VectorIndex("point payload lacks chunk_id".to_string()))?;
        let text = payload_str(point, PAYLOAD_TEXT).unwrap_or_default();
        let file = payload_str(point, PAYLOAD_FILE).unwrap_or_default();
        let page = payload_int(point, PAYLOAD_PAGE)
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| Error::VectorIndex(format!("point {} has no valid page", id)))?;

        Ok(IndexHit {
            id: id.to_string(),
            chunk: Chunk::new(text, file, page),
            score: point.score,
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries.iter().map(Self::entry_to_point).collect();
        let _guard = self.collection_lock.write().await;
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(|e| Error::VectorIndex(format!("Qdrant upsert failed: {}", e)))?;
        debug!(count = entries.len(), "upserted points");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        let _guard = self.collection_lock.read().await;
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection_name)
                    .query(vector.to_vec())
                    .limit(top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Error::VectorIndex(format!("Qdrant search failed: {}", e)))?;

        response.result.iter().map(Self::point_to_hit).collect()
    }

    async fn reset(&self) -> Result<()> {
        let _guard = self.collection_lock.write().await;
        self.client
            .delete_collection(DeleteCollectionBuilder::new(&self.collection_name))
            .await
            .map_err(|e| Error::VectorIndex(format!("Qdrant delete failed: {}", e)))?;
        self.ensure_collection().await
    }

    async fn count(&self) -> Result<usize> {
        let _guard = self.collection_lock.read().await;
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).exact(true))
            .await
            .map_err(|e| Error::VectorIndex(format!("Qdrant count failed: {}", e)))?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}
