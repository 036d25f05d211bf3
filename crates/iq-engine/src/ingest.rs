//! Catalog ingestion: embeds every reference text and upserts it into the
//! intent collection under a deterministic id.
//!
//! Texts are deduplicated before a single batch embedding call. After the
//! upsert, points in the collection that no longer belong to the catalog
//! are deleted, so shrinking an intent's examples does not leave orphans.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use iq_protocol::api::{IngestReport, IngestRequest, IngestStatus};
use iq_protocol::{Intent, IntentPointPayload, SourceKind};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::embedder::{Embedder, normalize};
use crate::error::{EngineError, EngineResult};
use crate::index::{Point, VectorIndex, deterministic_id};

/// Upper bound on ids listed when looking for stale points.
pub const SCROLL_LIMIT: usize = 100_000;

/// Point id for one reference text.
pub fn intent_point_id(intent_id: u32, source: SourceKind, text: &str) -> String {
    deterministic_id(&format!("{intent_id}:{}:{text}", source.as_str()))
}

/// One planned point before embedding.
struct Planned<'a> {
    id: String,
    intent: &'a Intent,
    source: SourceKind,
    text: String,
}

/// Counts produced by a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub intents: usize,
    pub vectors: usize,
    pub removed: usize,
    pub skipped: bool,
}

/// Loads a [`Catalog`] into a vector collection.
#[derive(Clone)]
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    /// Run ingestion and summarize the outcome. Failures are reported in
    /// the returned status rather than propagated.
    pub async fn ingest(&self, catalog: &Catalog, options: &IngestRequest) -> IngestReport {
        let run_id = Uuid::now_v7();
        tracing::info!(
            %run_id,
            collection = %self.collection,
            dry_run = options.dry_run,
            force = options.force,
            "starting catalog ingestion"
        );

        let (status, stats, message) = match self.run(catalog, options).await {
            Ok(stats) => {
                let message = if options.dry_run {
                    format!(
                        "dry run: {} intents, {} vectors planned, nothing stored",
                        stats.intents, stats.vectors
                    )
                } else if stats.skipped {
                    "catalog already ingested; pass force to re-ingest".to_string()
                } else {
                    format!(
                        "ingested {} intents ({} vectors), removed {} stale points",
                        stats.intents, stats.vectors, stats.removed
                    )
                };
                tracing::info!(%run_id, vectors = stats.vectors, removed = stats.removed, "{message}");
                (IngestStatus::Success, stats, message)
            }
            Err(e) => {
                tracing::error!(%run_id, error = %e, "catalog ingestion failed");
                (IngestStatus::Error, IngestStats::default(), e.to_string())
            }
        };

        IngestReport {
            run_id,
            status,
            dry_run: options.dry_run,
            intents: stats.intents,
            vectors: stats.vectors,
            removed: stats.removed,
            message,
            finished_at: Utc::now(),
        }
    }

    /// Run ingestion, propagating the first failure.
    pub async fn run(&self, catalog: &Catalog, options: &IngestRequest) -> EngineResult<IngestStats> {
        let plan = plan(catalog);
        let mut stats = IngestStats {
            intents: catalog.len(),
            vectors: plan.len(),
            ..IngestStats::default()
        };

        if options.dry_run {
            return Ok(stats);
        }

        let wanted: HashSet<&str> = plan.iter().map(|p| p.id.as_str()).collect();

        if !options.force && self.already_ingested(&plan).await? {
            tracing::info!(collection = %self.collection, "collection matches catalog, skipping");
            stats.vectors = 0;
            stats.skipped = true;
            return Ok(stats);
        }

        // Embed each distinct text once.
        let mut unique: Vec<String> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        for p in &plan {
            if !position.contains_key(p.text.as_str()) {
                position.insert(p.text.as_str(), unique.len());
                unique.push(p.text.clone());
            }
        }

        tracing::debug!(texts = unique.len(), model = self.embedder.model_name(), "embedding catalog");
        let vectors = self.embedder.batch_embed(&unique).await?;
        if vectors.is_empty() {
            return Err(EngineError::Embedding("embedder returned no vectors".into()));
        }
        if vectors.len() != unique.len() {
            return Err(EngineError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                unique.len()
            )));
        }

        self.index
            .ensure_collection(&self.collection, self.embedder.dimension())
            .await?;

        // Upsert grouped by intent, in catalog order.
        for intent in catalog.intents() {
            let mut points = Vec::new();
            for p in plan.iter().filter(|p| p.intent.id == intent.id) {
                let payload = IntentPointPayload::new(p.intent, p.source, &p.text);
                points.push(Point {
                    id: p.id.clone(),
                    vector: vectors[position[p.text.as_str()]].clone(),
                    payload: serde_json::to_value(&payload)?,
                });
            }
            tracing::debug!(intent_id = intent.id, points = points.len(), "upserting intent");
            self.index.upsert(&self.collection, points).await?;
        }

        stats.removed = self.remove_stale(&wanted).await?;
        Ok(stats)
    }

    /// True when the collection holds exactly the planned points with the
    /// payloads the current catalog would write. Ids only cover the text, so
    /// an intent whose operation or category changed must still re-ingest.
    async fn already_ingested(&self, plan: &[Planned<'_>]) -> EngineResult<bool> {
        let existing = match self.index.scroll(&self.collection, None, SCROLL_LIMIT).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::debug!(error = %e, "could not list existing points");
                return Ok(false);
            }
        };
        if existing.len() != plan.len() {
            return Ok(false);
        }

        let mut expected = HashMap::with_capacity(plan.len());
        for p in plan {
            let payload = IntentPointPayload::new(p.intent, p.source, &p.text);
            expected.insert(p.id.as_str(), serde_json::to_value(&payload)?);
        }
        Ok(existing
            .iter()
            .all(|p| expected.get(p.id.as_str()) == Some(&p.payload)))
    }

    async fn remove_stale(&self, wanted: &HashSet<&str>) -> EngineResult<usize> {
        let existing = self.index.scroll(&self.collection, None, SCROLL_LIMIT).await?;
        let stale: Vec<String> = existing
            .into_iter()
            .map(|p| p.id)
            .filter(|id| !wanted.contains(id.as_str()))
            .collect();

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "deleting stale points");
            self.index.delete(&self.collection, &stale).await?;
        }
        Ok(stale.len())
    }
}

/// Every distinct (intent, source, text) triple, in catalog order.
fn plan(catalog: &Catalog) -> Vec<Planned<'_>> {
    let mut seen = HashSet::new();
    let mut planned = Vec::new();
    for intent in catalog.intents() {
        for (source, raw) in intent.variants() {
            let text = normalize(raw);
            if text.is_empty() {
                continue;
            }
            let id = intent_point_id(intent.id, source, &text);
            if seen.insert(id.clone()) {
                planned.push(Planned {
                    id,
                    intent,
                    source,
                    text,
                });
            }
        }
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{HashingEmbedder, MemoryIndex};
    use iq_protocol::{Category, Operation};

    const COLLECTION: &str = "sql_intents";

    fn setup() -> (Arc<HashingEmbedder>, Arc<MemoryIndex>, Ingestor) {
        let embedder = Arc::new(HashingEmbedder::new(128));
        let index = Arc::new(MemoryIndex::new());
        let ingestor = Ingestor::new(embedder.clone(), index.clone(), COLLECTION);
        (embedder, index, ingestor)
    }

    fn run_opts() -> IngestRequest {
        IngestRequest {
            force: true,
            dry_run: false,
        }
    }

    fn tiny_intent(examples: &[&str]) -> Intent {
        Intent {
            id: 1,
            operation: Operation::SelectBasic,
            category: Category::Read,
            complexity: 1,
            sql_pattern: String::new(),
            text: "Retrieve rows.".into(),
            examples: examples.iter().map(|s| s.to_string()).collect(),
            paraphrases: vec![],
            keywords: vec![],
        }
    }

    #[test]
    fn point_id_is_md5_of_composite_key() {
        assert_eq!(
            intent_point_id(101, SourceKind::Example, "show all employees"),
            deterministic_id("101:example:show all employees")
        );
        assert_ne!(
            intent_point_id(101, SourceKind::Example, "x"),
            intent_point_id(101, SourceKind::Paraphrase, "x")
        );
    }

    #[tokio::test]
    async fn ingests_full_catalog() {
        let (_, index, ingestor) = setup();
        let catalog = Catalog::builtin();
        let report = ingestor.ingest(&catalog, &run_opts()).await;

        assert_eq!(report.status, IngestStatus::Success);
        assert_eq!(report.intents, 19);
        assert_eq!(report.vectors, catalog.reference_text_count());
        assert_eq!(report.removed, 0);
        assert_eq!(index.len(COLLECTION).await, report.vectors);
    }

    #[tokio::test]
    async fn reingestion_is_idempotent() {
        let (_, index, ingestor) = setup();
        let catalog = Catalog::builtin();

        ingestor.ingest(&catalog, &run_opts()).await;
        let first_ids = index.point_ids(COLLECTION).await;
        let first = index.scroll(COLLECTION, None, SCROLL_LIMIT).await.unwrap();

        let report = ingestor.ingest(&catalog, &run_opts()).await;
        let second = index.scroll(COLLECTION, None, SCROLL_LIMIT).await.unwrap();

        assert_eq!(report.removed, 0);
        assert_eq!(index.point_ids(COLLECTION).await, first_ids);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unforced_rerun_is_skipped() {
        let (_, index, ingestor) = setup();
        let catalog = Catalog::builtin();
        ingestor.ingest(&catalog, &run_opts()).await;

        let report = ingestor.ingest(&catalog, &IngestRequest::default()).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert_eq!(report.vectors, 0);
        assert!(report.message.contains("already ingested"));
        assert_eq!(index.len(COLLECTION).await, catalog.reference_text_count());
    }

    #[tokio::test]
    async fn unforced_rerun_refreshes_changed_payloads() {
        let (_, index, ingestor) = setup();
        let before = Catalog::new(vec![tiny_intent(&["drop rows"])]).unwrap();
        ingestor.ingest(&before, &run_opts()).await;

        let mut changed = tiny_intent(&["drop rows"]);
        changed.operation = Operation::DeleteRecord;
        changed.category = Category::Write;
        let after = Catalog::new(vec![changed]).unwrap();

        let report = ingestor.ingest(&after, &IngestRequest::default()).await;
        assert_eq!(report.status, IngestStatus::Success);
        assert!(!report.message.contains("already ingested"));
        assert_eq!(report.vectors, 2);

        let points = index.scroll(COLLECTION, None, SCROLL_LIMIT).await.unwrap();
        assert_eq!(points.len(), 2);
        for point in points {
            assert_eq!(point.payload["operation"], "DELETE_RECORD");
            assert_eq!(point.payload["category"], "WRITE");
            assert_eq!(point.payload["rule_tags"], serde_json::json!(["DELETE"]));
        }
    }

    #[tokio::test]
    async fn stale_points_are_removed() {
        let (_, index, ingestor) = setup();

        let before = Catalog::new(vec![tiny_intent(&["show rows", "list rows"])]).unwrap();
        ingestor.ingest(&before, &run_opts()).await;
        assert_eq!(index.len(COLLECTION).await, 3);

        let after = Catalog::new(vec![tiny_intent(&["show rows"])]).unwrap();
        let report = ingestor.ingest(&after, &run_opts()).await;

        assert_eq!(report.removed, 1);
        assert_eq!(index.len(COLLECTION).await, 2);
        let ids = index.point_ids(COLLECTION).await;
        assert!(!ids.contains(&intent_point_id(1, SourceKind::Example, "list rows")));
    }

    #[tokio::test]
    async fn duplicate_variants_collapse() {
        let (_, index, ingestor) = setup();
        let catalog = Catalog::new(vec![tiny_intent(&["show rows", "show  rows"])]).unwrap();
        let report = ingestor.ingest(&catalog, &run_opts()).await;
        assert_eq!(report.vectors, 2);
        assert_eq!(index.len(COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn point_id_uses_normalized_text() {
        let (_, index, ingestor) = setup();
        let catalog = Catalog::new(vec![tiny_intent(&["  show   rows "])]).unwrap();
        ingestor.ingest(&catalog, &run_opts()).await;

        let id = intent_point_id(1, SourceKind::Example, "show rows");
        let points = index.scroll(COLLECTION, None, SCROLL_LIMIT).await.unwrap();
        let point = points.iter().find(|p| p.id == id).unwrap();
        assert_eq!(point.payload["text"], "show rows");
    }

    #[tokio::test]
    async fn payload_is_denormalized() {
        let (_, index, ingestor) = setup();
        ingestor.ingest(&Catalog::builtin(), &run_opts()).await;

        let id = intent_point_id(503, SourceKind::Example, "delete user 501");
        let points = index.scroll(COLLECTION, None, SCROLL_LIMIT).await.unwrap();
        let point = points.iter().find(|p| p.id == id).unwrap();
        assert_eq!(point.payload["intent_id"], 503);
        assert_eq!(point.payload["operation"], "DELETE_RECORD");
        assert_eq!(point.payload["category"], "WRITE");
        assert_eq!(point.payload["source"], "example");
        assert_eq!(point.payload["rule_tags"], serde_json::json!(["DELETE"]));
    }

    // ── Dry run and failures ────────────────────────────────────

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let (embedder, index, ingestor) = setup();
        // A failing embedder proves the dry run never calls it.
        embedder.set_failing(true);
        index.set_failing(true);

        let report = ingestor
            .ingest(
                &Catalog::builtin(),
                &IngestRequest {
                    force: false,
                    dry_run: true,
                },
            )
            .await;
        assert_eq!(report.status, IngestStatus::Success);
        assert!(report.dry_run);
        assert_eq!(report.intents, 19);
        assert_eq!(report.vectors, Catalog::builtin().reference_text_count());
    }

    #[tokio::test]
    async fn embedder_failure_reported() {
        let (embedder, index, ingestor) = setup();
        embedder.set_failing(true);

        let report = ingestor.ingest(&Catalog::builtin(), &run_opts()).await;
        assert_eq!(report.status, IngestStatus::Error);
        assert!(report.message.contains("embedding"));
        assert_eq!(index.len(COLLECTION).await, 0);
    }
}
