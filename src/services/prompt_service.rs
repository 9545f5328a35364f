// ==================== PROMPTS (SUPABASE) ====================
// Acesso tabular ao recurso `prompts` via PostgREST, sempre configurado com
// a URL/anon key resolvidas para o usuário.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewPrompt, Prompt, PromptPage, SupabaseConfig};

const PROMPTS_TABLE: &str = "prompts";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("No database is configured for this user")]
    NotConfigured,
    #[error("Could not reach the database: {0}")]
    Network(String),
    #[error("The database did not answer within {0:?}")]
    Timeout(Duration),
    #[error("The database returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("The database returned an unexpected response: {0}")]
    InvalidResponse(String),
}

impl PromptError {
    pub fn kind(&self) -> &'static str {
        match self {
            PromptError::NotConfigured => "database_not_configured",
            PromptError::Network(_) => "database_network",
            PromptError::Timeout(_) => "database_timeout",
            PromptError::HttpStatus { .. } => "database_http_status",
            PromptError::InvalidResponse(_) => "database_invalid_response",
        }
    }
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Most recent prompt, if any
    async fn latest(&self) -> Result<Option<Prompt>, PromptError>;
    async fn insert(&self, prompt: NewPrompt) -> Result<Prompt, PromptError>;
    /// `page` is 1-based; newest first
    async fn history(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<PromptPage, PromptError>;
}

/// Clamps paging input to `page >= 1` and `1..=MAX_PAGE_SIZE`.
pub fn normalize_paging(page: Option<u32>, page_size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

/// Total from a PostgREST `Content-Range` header (`0-9/42`, `*/0`).
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

pub struct SupabasePromptClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

impl SupabasePromptClient {
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, PromptError> {
        if !config.is_configured() {
            return Err(PromptError::NotConfigured);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.trim().to_string(),
            timeout,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, PROMPTS_TABLE)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> PromptError {
        if e.is_timeout() {
            PromptError::Timeout(self.timeout)
        } else {
            PromptError::Network(e.to_string())
        }
    }

    async fn read_rows(&self, response: reqwest::Response) -> Result<Vec<Prompt>, PromptError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            log::warn!("⚠️  Supabase returned {} for prompts", status);
            return Err(PromptError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| PromptError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PromptRepository for SupabasePromptClient {
    async fn latest(&self) -> Result<Option<Prompt>, PromptError> {
        log::info!("📝 Fetching latest prompt");

        let url = format!("{}?select=*&order=created_at.desc&limit=1", self.table_url());
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        Ok(self.read_rows(response).await?.into_iter().next())
    }

    async fn insert(&self, prompt: NewPrompt) -> Result<Prompt, PromptError> {
        log::info!("📝 Inserting prompt for {}", prompt.created_by);

        let response = self
            .request(reqwest::Method::POST, &self.table_url())
            .header("Prefer", "return=representation")
            .json(&prompt)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        self.read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::InvalidResponse("insert returned no row".to_string()))
    }

    async fn history(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<PromptPage, PromptError> {
        let (page, page_size) = normalize_paging(Some(page), Some(page_size));
        let offset = u64::from(page - 1) * u64::from(page_size);

        let mut url = format!(
            "{}?select=*&order=created_at.desc&limit={}&offset={}",
            self.table_url(),
            page_size,
            offset
        );
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            url.push_str("&content=ilike.");
            url.push_str(&urlencoding::encode(&format!("*{}*", term)));
        }

        log::info!("📚 Fetching prompt history page {} (size {})", page, page_size);

        let response = self
            .request(reqwest::Method::GET, &url)
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let prompts = self.read_rows(response).await?;

        Ok(PromptPage {
            prompts,
            page,
            page_size,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rows() -> serde_json::Value {
        serde_json::json!([
            {"id": 7, "content": "Explain like a TA", "created_by": "professor-001", "created_at": "2024-05-02T09:00:00Z"},
            {"id": 6, "content": "Be concise", "created_at": "2024-05-01T09:00:00Z"}
        ])
    }

    async fn client(server: &MockServer) -> SupabasePromptClient {
        SupabasePromptClient::new(
            &SupabaseConfig::new(format!("{}/", server.uri()), "anon"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_paging_is_clamped() {
        assert_eq!(normalize_paging(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(normalize_paging(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_paging(Some(3), Some(1000)), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }

    #[test]
    fn test_unconfigured_database_is_rejected() {
        let result = SupabasePromptClient::new(&SupabaseConfig::default(), Duration::from_secs(1));
        assert!(matches!(result, Err(PromptError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_latest_orders_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/prompts"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "1"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows()))
            .mount(&server)
            .await;

        let latest = client(&server).await.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, 7);
        assert_eq!(latest.created_by.as_deref(), Some("professor-001"));
    }

    #[tokio::test]
    async fn test_latest_on_empty_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        assert!(client(&server).await.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_returns_created_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/prompts"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(serde_json::json!({"content": "New prompt", "created_by": "professor-001"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
                {"id": 8, "content": "New prompt", "created_by": "professor-001", "created_at": "2024-05-03T09:00:00Z"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .await
            .insert(NewPrompt {
                content: "New prompt".into(),
                created_by: "professor-001".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 8);
    }

    #[tokio::test]
    async fn test_history_pages_and_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/prompts"))
            .and(query_param("limit", "2"))
            .and(query_param("offset", "2"))
            .and(query_param("content", "ilike.*TA*"))
            .and(header("Prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "2-3/5")
                    .set_body_json(rows()),
            )
            .mount(&server)
            .await;

        let page = client(&server).await.history(2, 2, Some("TA")).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.total, Some(5));
        assert_eq!(page.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_http_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client(&server).await.latest().await.unwrap_err();
        assert!(matches!(err, PromptError::HttpStatus { status: 401, .. }));
    }
}
