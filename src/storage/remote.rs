//! Remote storage backend.
//!
//! Maps the storage contract 1:1 onto HTTP verbs against a backend API.
//! Authentication is an optional bearer token; anything beyond that is the
//! backend's problem.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::StorageAdapter;
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::types::{Context, Task, View};

/// HTTP client speaking the backend's REST surface.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteStore {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Storage(format!(
                "api request failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            )));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    async fn write_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.send(self.request(method, path).json(body)).await?;
        Ok(())
    }

    fn task_path(id: &str) -> String {
        format!("/tasks/{}", urlencoding::encode(id))
    }
}

#[async_trait]
impl StorageAdapter for RemoteStore {
    async fn init(&self) -> Result<()> {
        // Reachability is checked lazily on first use; the backend may come
        // up after we do.
        Ok(())
    }

    async fn get_tasks(&self) -> Result<Vec<Task>> {
        self.get_json("/tasks").await
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write_json(Method::PUT, "/tasks", &json!({ "tasks": tasks }))
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let response = self
            .request(Method::GET, &Self::task_path(id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Storage(format!(
                "api request failed: {}",
                status.as_u16()
            )));
        }
        Ok(Some(response.json().await?))
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        self.write_json(Method::POST, "/tasks", task).await
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        self.write_json(Method::PATCH, &Self::task_path(&task.id), task)
            .await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &Self::task_path(id)))
            .await?;
        Ok(())
    }

    async fn get_contexts(&self) -> Result<Vec<Context>> {
        self.get_json("/contexts").await
    }

    async fn save_contexts(&self, contexts: &[Context]) -> Result<()> {
        self.write_json(Method::PUT, "/contexts", &json!({ "contexts": contexts }))
            .await
    }

    async fn get_settings(&self) -> Result<Value> {
        let value: Value = self.get_json("/settings").await?;
        if value.is_null() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(value)
    }

    async fn save_settings(&self, settings: &Value) -> Result<()> {
        self.write_json(Method::PUT, "/settings", settings).await
    }

    async fn get_views(&self) -> Result<Vec<View>> {
        self.get_json("/views").await
    }

    async fn save_views(&self, views: &[View]) -> Result<()> {
        self.write_json(Method::PUT, "/views", &json!({ "views": views }))
            .await
    }

    async fn clear_all(&self) -> Result<()> {
        self.send(self.request(Method::DELETE, "/data")).await?;
        Ok(())
    }

    async fn export_all(&self) -> Result<Snapshot> {
        self.get_json("/export").await
    }

    async fn import_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_json(Method::POST, "/import", snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let store = RemoteStore::new("https://deck.example.com/api/".to_string(), None);
        assert_eq!(store.base_url, "https://deck.example.com/api");
    }

    #[test]
    fn task_ids_are_url_encoded() {
        assert_eq!(RemoteStore::task_path("task a/b"), "/tasks/task%20a%2Fb");
    }
}
