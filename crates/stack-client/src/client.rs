use async_trait::async_trait;
use migrate_core::{ApiError, ApiResult, ContentType, Entry, Locale, StackClient, StackSettings};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, StackClientError};
use crate::types::{
    ContentTypeBody, ContentTypeEnvelope, EntriesPage, EntryBody, EntryEnvelope, ErrorBody,
    LocalesEnvelope,
};

pub const DEFAULT_HOST: &str = "https://api.contentstack.io";

/// Entries requested per page.
pub const PAGE_SIZE: usize = 100;

// ─── HttpStackClient ──────────────────────────────────────────────────────

/// [`StackClient`] over the content management REST API.
///
/// Credentials and branch are sent as default headers on every request.
/// Retries are the engine's business; each method makes exactly one attempt
/// (one per page for entry listings).
#[derive(Debug, Clone)]
pub struct HttpStackClient {
    http: reqwest::Client,
    base_url: String,
}

fn header(name: &'static str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| StackClientError::InvalidHeader(name))
}

fn transport_error(e: reqwest::Error) -> ApiError {
    ApiError {
        status: e.status().map(|s| s.as_u16()),
        ..ApiError::new(e.to_string())
    }
}

impl HttpStackClient {
    pub fn new(base_url: impl Into<String>, settings: &StackSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("api_key"),
            header("api_key", &settings.api_key)?,
        );
        if let Some(token) = &settings.management_token {
            headers.insert(AUTHORIZATION, header("authorization", token)?);
        }
        if let Some(branch) = &settings.branch {
            headers.insert(HeaderName::from_static("branch"), header("branch", branch)?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v3/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let request = request.build().map_err(transport_error)?;
        tracing::debug!(method = %request.method(), url = %request.url(), "request");
        let response = self.http.execute(request).await.map_err(transport_error)?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return response.json::<T>().await.map_err(|e| {
                ApiError::with_status(status, format!("invalid response body: {e}"))
            });
        }

        let raw = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let error = body.into_api_error(status, &raw);
        tracing::debug!(status, message = %error.message, "request failed");
        Err(error)
    }

    async fn fetch_entries_page(
        &self,
        content_type: &str,
        locale: &str,
        skip: usize,
    ) -> ApiResult<EntriesPage> {
        let skip = skip.to_string();
        let limit = PAGE_SIZE.to_string();
        let request = self
            .http
            .get(self.url(&format!("content_types/{content_type}/entries")))
            .query(&[
                ("locale", locale),
                ("skip", skip.as_str()),
                ("limit", limit.as_str()),
                ("include_count", "true"),
            ]);
        self.send(request).await
    }
}

#[async_trait]
impl StackClient for HttpStackClient {
    async fn fetch_content_type(&self, uid: &str) -> ApiResult<ContentType> {
        let envelope: ContentTypeEnvelope = self
            .send(self.http.get(self.url(&format!("content_types/{uid}"))))
            .await?;
        Ok(envelope.content_type)
    }

    async fn create_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        let request = self
            .http
            .post(self.url("content_types"))
            .json(&ContentTypeBody { content_type });
        let envelope: ContentTypeEnvelope = self.send(request).await?;
        Ok(envelope.content_type)
    }

    async fn update_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        let request = self
            .http
            .put(self.url(&format!("content_types/{}", content_type.uid)))
            .json(&ContentTypeBody { content_type });
        let envelope: ContentTypeEnvelope = self.send(request).await?;
        Ok(envelope.content_type)
    }

    async fn delete_content_type(&self, uid: &str, force: bool) -> ApiResult<()> {
        let request = self
            .http
            .delete(self.url(&format!("content_types/{uid}")))
            .query(&[("force", force)]);
        let _notice: Value = self.send(request).await?;
        Ok(())
    }

    async fn fetch_locales(&self) -> ApiResult<Vec<Locale>> {
        let envelope: LocalesEnvelope = self.send(self.http.get(self.url("locales"))).await?;
        Ok(envelope.locales)
    }

    /// Every entry of `content_type` in `locale`, page by page.
    async fn fetch_entries(&self, content_type: &str, locale: &str) -> ApiResult<Vec<Entry>> {
        let mut entries = Vec::new();
        loop {
            let page = self
                .fetch_entries_page(content_type, locale, entries.len())
                .await?;
            let received = page.entries.len();
            entries.extend(page.entries);

            let exhausted = match page.count {
                Some(count) => entries.len() >= count,
                None => received < PAGE_SIZE,
            };
            if exhausted || received == 0 {
                return Ok(entries);
            }
        }
    }

    async fn create_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        let request = self
            .http
            .post(self.url(&format!("content_types/{content_type}/entries")))
            .query(&[("locale", locale)])
            .json(&EntryBody { entry });
        let envelope: EntryEnvelope = self.send(request).await?;
        Ok(envelope.entry)
    }

    async fn update_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        let uid = entry
            .uid()
            .ok_or_else(|| ApiError::new("entry has no uid to update"))?;
        let request = self
            .http
            .put(self.url(&format!("content_types/{content_type}/entries/{uid}")))
            .query(&[("locale", locale)])
            .json(&EntryBody { entry });
        let envelope: EntryEnvelope = self.send(request).await?;
        Ok(envelope.entry)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
