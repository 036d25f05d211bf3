//! In-process embedder and vector index for tests and offline development.
//!
//! `HashingEmbedder` maps texts to normalized bag-of-words vectors by
//! feature hashing, so identical wording gives cosine 1.0 and shared words
//! give partial similarity. `MemoryIndex` stores points in a map and
//! answers searches by brute-force cosine. Both can be switched into a
//! failing mode to exercise upstream-fault handling. `StaticGenerator`
//! stands in for an LLM provider.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::{Mutex, RwLock};

use crate::embedder::{Embedder, l2_normalize, normalize};
use crate::error::{EngineError, EngineResult};
use crate::generation::SqlGenerator;
use crate::index::{Filter, Point, ScoredPoint, SearchQuery, StoredPoint, VectorIndex};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("token pattern is valid"));

/// Deterministic feature-hashing embedder.
pub struct HashingEmbedder {
    dimension: usize,
    failing: AtomicBool,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = normalize(text).to_lowercase();
        let mut v = vec![0.0f32; self.dimension];
        for token in TOKEN.find_iter(&lower) {
            let bucket = (fnv1a(token.as_str()) % self.dimension as u64) as usize;
            v[bucket] += 1.0;
        }
        l2_normalize(v)
    }

    fn check(&self) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Embedding("hashing embedder set to fail".into()));
        }
        Ok(())
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.check()?;
        Ok(self.vectorize(text))
    }

    async fn batch_embed(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        self.check()?;
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing-bow"
    }
}

/// 64-bit FNV-1a; stable across runs and platforms.
fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Cosine similarity; 0.0 when either vector has zero length.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

struct Collection {
    vector_size: usize,
    points: BTreeMap<String, Point>,
}

/// In-memory vector index.
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
    failing: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of points in a collection (0 if it does not exist).
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    /// Sorted point ids of a collection.
    pub async fn point_ids(&self, collection: &str) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn check(&self) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Index("memory index set to fail".into()));
        }
        Ok(())
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(collection: &str) -> EngineError {
    EngineError::Index(format!("collection '{collection}' not found"))
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, collection: &str, vector_size: usize) -> EngineResult<()> {
        self.check()?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                vector_size,
                points: BTreeMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()> {
        self.check()?;
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != coll.vector_size) {
            return Err(EngineError::Index(format!(
                "point {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                coll.vector_size
            )));
        }
        for point in points {
            coll.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> EngineResult<Vec<ScoredPoint>> {
        self.check()?;
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut scored: Vec<ScoredPoint> = coll
            .points
            .values()
            .filter(|p| query.filter.as_ref().is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine(&query.vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(query.limit);
        Ok(scored)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> EngineResult<Vec<StoredPoint>> {
        self.check()?;
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;

        Ok(coll
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .take(limit)
            .map(|p| StoredPoint {
                id: p.id.clone(),
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> EngineResult<()> {
        self.check()?;
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        for id in ids {
            coll.points.remove(id);
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// SQL generator returning a fixed completion and recording its last prompt.
pub struct StaticGenerator {
    name: String,
    reply: String,
    last: Mutex<Option<(String, String)>>,
}

impl StaticGenerator {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
            last: Mutex::new(None),
        }
    }

    /// `(system, user)` of the most recent call.
    pub async fn last_prompt(&self) -> Option<(String, String)> {
        self.last.lock().await.clone()
    }
}

#[async_trait]
impl SqlGenerator for StaticGenerator {
    async fn generate(&self, system: &str, user: &str) -> EngineResult<String> {
        *self.last.lock().await = Some((system.to_string(), user.to_string()));
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
