//! Qdrant REST client implementing [`VectorIndex`].
//!
//! Talks to the plain HTTP API (`/collections/...`) with an optional
//! `api-key` header. Point ids are UUID strings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use iq_engine::index::{
    Condition, Filter, Point, ScoredPoint, SearchQuery, StoredPoint, VectorIndex,
};
use iq_engine::{EngineError, EngineResult};

use crate::config::IndexConfig;

/// Largest page requested per scroll call.
const SCROLL_PAGE: usize = 256;

pub struct QdrantIndex {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollEntry>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollEntry {
    id: Value,
    #[serde(default)]
    payload: Option<Value>,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Index(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{collection}{suffix}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> EngineResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::Index(format!("qdrant {what} request failed: {e}")))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(EngineError::Index(format!("qdrant {what} failed ({status}): {text}")))
    }
}

/// Render a filter in Qdrant's `{"must": [...]}` form.
pub fn filter_json(filter: &Filter) -> Value {
    let must: Vec<Value> = filter
        .must
        .iter()
        .map(|c| match c {
            Condition::MatchAny { key, values } => json!({"key": key, "match": {"any": values}}),
            Condition::MatchValue { key, value } => json!({"key": key, "match": {"value": value}}),
        })
        .collect();
    json!({ "must": must })
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, collection: &str, vector_size: usize) -> EngineResult<()> {
        let existing = self
            .request(reqwest::Method::GET, self.url(collection, ""))
            .send()
            .await
            .map_err(|e| EngineError::Index(format!("qdrant collection lookup failed: {e}")))?;
        if existing.status().is_success() {
            return Ok(());
        }

        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });
        let response = self
            .request(reqwest::Method::PUT, self.url(collection, ""))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Index(format!("qdrant create collection failed: {e}")))?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::CONFLICT => {
                tracing::info!(collection, vector_size, "qdrant collection ready");
                Ok(())
            }
            other => {
                let text = response.text().await.unwrap_or_default();
                Err(EngineError::Index(format!(
                    "qdrant collection error ({other}): {text}"
                )))
            }
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| json!({"id": p.id, "vector": p.vector, "payload": p.payload}))
            .collect();
        let builder = self
            .request(reqwest::Method::POST, self.url(collection, "/points"))
            .query(&[("wait", "true")])
            .json(&json!({ "points": points }));
        self.send(builder, "upsert").await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> EngineResult<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": query.vector,
            "limit": query.limit,
            "with_payload": true,
        });
        if let Some(filter) = &query.filter {
            body["filter"] = filter_json(filter);
        }
        let builder = self
            .request(reqwest::Method::POST, self.url(collection, "/points/search"))
            .json(&body);
        let response: SearchResponse = self
            .send(builder, "search")
            .await?
            .json()
            .await
            .map_err(|e| EngineError::Index(format!("invalid qdrant search response: {e}")))?;

        Ok(response
            .result
            .into_iter()
            .map(|e| ScoredPoint {
                id: id_string(&e.id),
                score: e.score,
                payload: e.payload.unwrap_or(Value::Null),
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> EngineResult<Vec<StoredPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;

        while points.len() < limit {
            let mut body = json!({
                "limit": (limit - points.len()).min(SCROLL_PAGE),
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(filter) = filter {
                body["filter"] = filter_json(filter);
            }
            if let Some(offset) = &offset {
                body["offset"] = offset.clone();
            }

            let builder = self
                .request(reqwest::Method::POST, self.url(collection, "/points/scroll"))
                .json(&body);
            let page: ScrollResponse = self
                .send(builder, "scroll")
                .await?
                .json()
                .await
                .map_err(|e| EngineError::Index(format!("invalid qdrant scroll response: {e}")))?;

            points.extend(page.result.points.into_iter().map(|e| StoredPoint {
                id: id_string(&e.id),
                payload: e.payload.unwrap_or(Value::Null),
            }));

            match page.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        points.truncate(limit);
        Ok(points)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let builder = self
            .request(reqwest::Method::POST, self.url(collection, "/points/delete"))
            .query(&[("wait", "true")])
            .json(&json!({ "points": ids }));
        self.send(builder, "delete").await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index_for(server: &MockServer, api_key: Option<&str>) -> QdrantIndex {
        QdrantIndex::new(&IndexConfig {
            url: format!("{}/", server.uri()),
            api_key: api_key.map(String::from),
            timeout_secs: 2,
            ..IndexConfig::default()
        })
        .unwrap()
    }

    // ── Filter rendering ────────────────────────────────────────

    #[test]
    fn filter_renders_match_any_and_value() {
        let filter = Filter::any_of("rule_tags", vec![json!("DELETE")]).and_value("type", "table");
        assert_eq!(
            filter_json(&filter),
            json!({"must": [
                {"key": "rule_tags", "match": {"any": ["DELETE"]}},
                {"key": "type", "match": {"value": "table"}}
            ]})
        );
    }

    // ── Collections ─────────────────────────────────────────────

    #[tokio::test]
    async fn ensure_collection_existing_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/sql_intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        index_for(&server, None)
            .ensure_collection("sql_intents", 384)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_creates_cosine_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/sql_intents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/sql_intents"))
            .and(header("api-key", "secret"))
            .and(body_partial_json(
                json!({"vectors": {"size": 384, "distance": "Cosine"}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
            .expect(1)
            .mount(&server)
            .await;

        index_for(&server, Some("secret"))
            .ensure_collection("sql_intents", 384)
            .await
            .unwrap();
    }

    // ── Points ──────────────────────────────────────────────────

    #[tokio::test]
    async fn upsert_waits_and_sends_points() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/c/points"))
            .and(query_param("wait", "true"))
            .and(body_partial_json(json!({"points": [{"id": "p1", "payload": {"intent_id": 1}}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        index_for(&server, None)
            .upsert(
                "c",
                vec![Point {
                    id: "p1".into(),
                    vector: vec![0.1, 0.2],
                    payload: json!({"intent_id": 1}),
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn search_parses_hits_and_sends_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/c/points/search"))
            .and(body_partial_json(json!({
                "limit": 5,
                "with_payload": true,
                "filter": {"must": [{"key": "rule_tags", "match": {"any": ["DELETE"]}}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"id": "a", "score": 0.91, "payload": {"intent_id": 503}},
                    {"id": 7, "score": 0.42, "payload": null}
                ],
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let hits = index_for(&server, None)
            .search(
                "c",
                &SearchQuery {
                    vector: vec![1.0, 0.0],
                    limit: 5,
                    filter: Some(Filter::any_of("rule_tags", vec![json!("DELETE")])),
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].payload["intent_id"], 503);
        assert_eq!(hits[1].id, "7");
        assert!(hits[1].payload.is_null());
    }

    #[tokio::test]
    async fn search_error_status_is_index_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/missing/points/search"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found: Collection"))
            .mount(&server)
            .await;

        let err = index_for(&server, None)
            .search(
                "missing",
                &SearchQuery {
                    vector: vec![1.0],
                    limit: 5,
                    filter: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Index(ref m) if m.contains("404")));
    }

    #[tokio::test]
    async fn scroll_follows_page_offsets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/c/points/scroll"))
            .and(body_partial_json(json!({"offset": "b"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"points": [{"id": "b", "payload": {}}], "next_page_offset": null}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/c/points/scroll"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"points": [{"id": "a", "payload": {}}], "next_page_offset": "b"}
            })))
            .mount(&server)
            .await;

        let points = index_for(&server, None).scroll("c", None, 100).await.unwrap();
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn delete_sends_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/c/points/delete"))
            .and(body_partial_json(json!({"points": ["x", "y"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        index_for(&server, None)
            .delete("c", &["x".to_string(), "y".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_index_error() {
        let index = QdrantIndex::new(&IndexConfig {
            url: "http://127.0.0.1:1".into(),
            timeout_secs: 1,
            ..IndexConfig::default()
        })
        .unwrap();
        assert!(index.delete("c", &["x".to_string()]).await.is_err());
    }
}
