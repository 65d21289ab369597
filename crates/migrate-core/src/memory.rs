//! In-memory [`StackClient`].
//!
//! Backs the engine tests and offline validation. Failures can be injected per
//! operation name (`"fetch_content_type"`, `"update_entry"`, ...) and every
//! call is recorded.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::{ApiError, ApiResult, StackClient};
use crate::types::{ContentType, Entry, Locale};

#[derive(Debug, Default)]
struct State {
    content_types: BTreeMap<String, ContentType>,
    locales: Vec<Locale>,
    entries: HashMap<(String, String), Vec<Entry>>,
    failures: HashMap<String, u32>,
    calls: Vec<String>,
    next_uid: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStack {
    state: Mutex<State>,
}

impl InMemoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Seeding ──

    pub fn with_content_type(self, content_type: ContentType) -> Self {
        self.lock()
            .content_types
            .insert(content_type.uid.clone(), content_type);
        self
    }

    pub fn with_locale(self, locale: Locale) -> Self {
        self.lock().locales.push(locale);
        self
    }

    pub fn with_entries(self, content_type: &str, locale: &str, entries: Vec<Entry>) -> Self {
        self.lock()
            .entries
            .insert((content_type.to_string(), locale.to_string()), entries);
        self
    }

    /// Make the next `times` calls to `operation` fail.
    pub fn fail_next(&self, operation: &str, times: u32) {
        self.lock().failures.insert(operation.to_string(), times);
    }

    // ── Inspection ──

    pub fn content_type(&self, uid: &str) -> Option<ContentType> {
        self.lock().content_types.get(uid).cloned()
    }

    pub fn entries(&self, content_type: &str, locale: &str) -> Vec<Entry> {
        self.lock()
            .entries
            .get(&(content_type.to_string(), locale.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Record the call and consume an injected failure if one is pending.
    fn enter(&self, operation: &str) -> ApiResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if let Some(remaining) = state.failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::with_status(
                    500,
                    format!("injected failure in {operation}"),
                ));
            }
        }
        Ok(state)
    }
}

fn not_found(uid: &str) -> ApiError {
    ApiError::with_status(
        422,
        format!("The Content Type '{uid}' was not found. Please try again."),
    )
}

#[async_trait]
impl StackClient for InMemoryStack {
    async fn fetch_content_type(&self, uid: &str) -> ApiResult<ContentType> {
        let state = self.enter("fetch_content_type")?;
        state.content_types.get(uid).cloned().ok_or_else(|| not_found(uid))
    }

    async fn create_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        let mut state = self.enter("create_content_type")?;
        if state.content_types.contains_key(&content_type.uid) {
            return Err(ApiError::with_status(
                422,
                format!("Content Type '{}' already exists.", content_type.uid),
            ));
        }
        state
            .content_types
            .insert(content_type.uid.clone(), content_type.clone());
        Ok(content_type.clone())
    }

    async fn update_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        let mut state = self.enter("update_content_type")?;
        match state.content_types.get_mut(&content_type.uid) {
            Some(existing) => {
                *existing = content_type.clone();
                Ok(content_type.clone())
            }
            None => Err(not_found(&content_type.uid)),
        }
    }

    async fn delete_content_type(&self, uid: &str, _force: bool) -> ApiResult<()> {
        let mut state = self.enter("delete_content_type")?;
        state
            .content_types
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| not_found(uid))
    }

    async fn fetch_locales(&self) -> ApiResult<Vec<Locale>> {
        let state = self.enter("fetch_locales")?;
        Ok(state.locales.clone())
    }

    async fn fetch_entries(&self, content_type: &str, locale: &str) -> ApiResult<Vec<Entry>> {
        let state = self.enter("fetch_entries")?;
        Ok(state
            .entries
            .get(&(content_type.to_string(), locale.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        let mut state = self.enter("create_entry")?;
        let mut created = entry.clone();
        if created.uid().is_none() {
            state.next_uid += 1;
            let uid = format!("blt{:016x}", state.next_uid);
            created.set("uid", serde_json::Value::String(uid));
        }
        state
            .entries
            .entry((content_type.to_string(), locale.to_string()))
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        let mut state = self.enter("update_entry")?;
        let uid = entry
            .uid()
            .ok_or_else(|| ApiError::with_status(422, "Entry uid is required."))?;
        let slot = state
            .entries
            .get_mut(&(content_type.to_string(), locale.to_string()))
            .and_then(|entries| entries.iter_mut().find(|e| e.uid() == Some(uid)))
            .ok_or_else(|| ApiError::with_status(404, format!("Entry '{uid}' was not found.")))?;
        *slot = entry.clone();
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let stack = InMemoryStack::new().with_locale(Locale::new("en-us"));
        stack.fail_next("fetch_locales", 1);
        assert!(stack.fetch_locales().await.is_err());
        assert_eq!(stack.fetch_locales().await.unwrap().len(), 1);
        assert_eq!(stack.call_count("fetch_locales"), 2);
    }

    #[tokio::test]
    async fn missing_content_type_is_an_api_error() {
        let stack = InMemoryStack::new();
        let err = stack.fetch_content_type("blog").await.unwrap_err();
        assert_eq!(err.status, Some(422));
        assert!(err.message.contains("'blog' was not found"));
    }

    #[tokio::test]
    async fn created_entries_get_uids() {
        let stack = InMemoryStack::new();
        let created = stack
            .create_entry("author", "en-us", &Entry::default())
            .await
            .unwrap();
        assert!(created.uid().unwrap().starts_with("blt"));
        assert_eq!(stack.entries("author", "en-us").len(), 1);
    }
}
