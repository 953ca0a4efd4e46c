//! Kibana HTTP Client Implementation
//!
//! Talks to the saved objects API (`{base_url}/api/saved_objects`) for
//! single objects and paged listings, and to the dashboards API
//! (`{base_url}/api/kibana/dashboards`) for dashboard export and for
//! imports.

use std::ops::ControlFlow;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use dashvault_artifacts::{Artifact, ArtifactType};

use crate::{
    ArtifactStore, ImportFailure, ImportReport, ImportedObject, StoreConfig, StoreError,
};

const SAVED_OBJECTS_PATH: [&str; 2] = ["api", "saved_objects"];
const DASHBOARDS_PATH: [&str; 3] = ["api", "kibana", "dashboards"];
const XSRF_HEADER: &str = "kbn-xsrf";

/// Listing stops after this many pages in a row could not be read
const MAX_CONSECUTIVE_SKIPPED_PAGES: u32 = 5;

/// One page of the saved objects listing
#[derive(Debug, Deserialize)]
struct SavedObjectsPage {
    #[serde(default)]
    saved_objects: Vec<Value>,
    #[serde(rename = "statusCode")]
    status_code: Option<u16>,
    message: Option<String>,
}

/// Body of a dashboard export or import response
#[derive(Debug, Deserialize)]
struct ObjectsEnvelope {
    #[serde(default)]
    objects: Vec<Value>,
}

/// What reading one listing page produced
#[derive(Debug)]
enum PageOutcome {
    Objects(Vec<Artifact>),
    Skipped,
    Exhausted,
}

/// Real Kibana HTTP client
pub struct KibanaClient {
    http: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    backoff: Duration,
}

impl KibanaClient {
    /// Create a new Kibana client from configuration.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            StoreError::Configuration(format!("Invalid store URL {}: {}", config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(XSRF_HEADER),
            HeaderValue::from_static("true"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    fn endpoint(&self, base: &[&str], rest: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Configuration(format!("Store URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(base)
            .extend(rest);
        Ok(url)
    }

    /// Send a request, retrying server errors and connection failures
    /// with a linearly growing delay.
    ///
    /// Once retries are exhausted a server-error response is returned as
    /// is, so callers decide what it means for them.
    async fn send(&self, request: impl Fn() -> RequestBuilder) -> Result<Response, StoreError> {
        let mut attempt = 0;
        loop {
            match request().send().await {
                Ok(response) if response.status().is_server_error() && attempt < self.max_retries => {
                    tracing::warn!(
                        status = %response.status(),
                        url = %response.url(),
                        attempt = attempt + 1,
                        "Store answered with a server error, retrying"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries && (e.is_connect() || e.is_timeout()) => {
                    tracing::warn!(error = %e, attempt = attempt + 1, "Store unreachable, retrying");
                }
                Err(e) => return Err(StoreError::Request(e.to_string())),
            }
            attempt += 1;
            tokio::time::sleep(self.backoff * attempt).await;
        }
    }

    async fn error_body(response: Response) -> String {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        format!("Store API returned {}: {}", status, body)
    }

    /// Fetch one page of the saved objects listing (pages start at 1)
    async fn fetch_page(&self, page: u32) -> Result<PageOutcome, StoreError> {
        let url = self.endpoint(&SAVED_OBJECTS_PATH, &[])?;
        let page_param = page.to_string();
        let response = self
            .send(|| self.http.get(url.clone()).query(&[("page", page_param.as_str())]))
            .await?;

        if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::warn!(page, url = %url, "Impossible to retrieve objects page");
            return Ok(PageOutcome::Skipped);
        }
        if !response.status().is_success() {
            return Err(StoreError::Response(Self::error_body(response).await));
        }

        let body: SavedObjectsPage = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;

        if let Some(status_code) = body.status_code {
            tracing::error!(
                page,
                status_code,
                message = body.message.as_deref().unwrap_or_default(),
                "Impossible to retrieve objects page"
            );
            return Ok(PageOutcome::Skipped);
        }
        if body.saved_objects.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        let objects = body
            .saved_objects
            .into_iter()
            .filter_map(|value| match Artifact::from_value(value) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Skipping unreadable saved object");
                    None
                }
            })
            .collect();
        Ok(PageOutcome::Objects(objects))
    }

    /// Walk the paged listing, handing each readable page to `visit`.
    ///
    /// Stops at the first empty page, when `visit` breaks, or after too
    /// many unreadable pages in a row.
    async fn walk_pages<B>(
        &self,
        mut visit: impl FnMut(Vec<Artifact>) -> ControlFlow<B>,
    ) -> Result<Option<B>, StoreError> {
        let mut page = 1;
        let mut skipped = 0;
        loop {
            match self.fetch_page(page).await? {
                PageOutcome::Objects(objects) => {
                    skipped = 0;
                    if let ControlFlow::Break(found) = visit(objects) {
                        return Ok(Some(found));
                    }
                }
                PageOutcome::Skipped => {
                    skipped += 1;
                    if skipped >= MAX_CONSECUTIVE_SKIPPED_PAGES {
                        tracing::error!(page, "Too many unreadable pages, listing stopped");
                        return Ok(None);
                    }
                }
                PageOutcome::Exhausted => return Ok(None),
            }
            page += 1;
        }
    }

    /// First listed object `matches` accepts
    async fn scan(
        &self,
        mut matches: impl FnMut(&Artifact) -> bool,
    ) -> Result<Option<Artifact>, StoreError> {
        self.walk_pages(|objects| match objects.into_iter().find(|o| matches(o)) {
            Some(found) => ControlFlow::Break(found),
            None => ControlFlow::Continue(()),
        })
        .await
    }

    async fn find_by_title(
        &self,
        artifact_type: ArtifactType,
        title: &str,
    ) -> Result<Artifact, StoreError> {
        let type_name = artifact_type.as_str();
        self.scan(|o| o.type_name == type_name && o.title() == Some(title))
            .await?
            .ok_or_else(|| {
                let cause = format!("No {} found with title: {}", artifact_type, title);
                tracing::error!("{}", cause);
                StoreError::NotFound(cause)
            })
    }

    async fn get_object(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Artifact, StoreError> {
        let url = self.endpoint(&SAVED_OBJECTS_PATH, &[artifact_type.as_str(), id])?;
        let response = self.send(|| self.http.get(url.clone())).await?;

        if response.status() == StatusCode::NOT_FOUND {
            let cause = format!(
                "Impossible to export {} with id {}, not found",
                artifact_type, id
            );
            tracing::error!("{}", cause);
            return Err(StoreError::NotFound(cause));
        }
        if !response.status().is_success() {
            return Err(StoreError::Response(Self::error_body(response).await));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;
        Artifact::from_value(value).map_err(|e| StoreError::Response(e.to_string()))
    }

    async fn export_dashboard(&self, id: &str) -> Result<Vec<Artifact>, StoreError> {
        let url = self.endpoint(&DASHBOARDS_PATH, &["export"])?;
        let response = self
            .send(|| self.http.get(url.clone()).query(&[("dashboard", id)]))
            .await?;

        let not_found = |reason: &str| {
            let cause = format!("Impossible to export dashboard with id {}, {}", id, reason);
            tracing::error!("{}", cause);
            StoreError::NotFound(cause)
        };

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(not_found("bad request"));
        }
        if !response.status().is_success() {
            return Err(StoreError::Response(Self::error_body(response).await));
        }

        let body: ObjectsEnvelope = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;

        match body.objects.first() {
            None => return Err(not_found("not found")),
            Some(first) => {
                if let Some(error) = first.get("error") {
                    let message = error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("not found")
                        .to_lowercase();
                    return Err(not_found(&message));
                }
            }
        }

        body.objects
            .into_iter()
            .map(|value| Artifact::from_value(value).map_err(|e| StoreError::Response(e.to_string())))
            .collect()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for KibanaClient {
    async fn export_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Vec<Artifact>, StoreError> {
        match artifact_type {
            ArtifactType::Dashboard => self.export_dashboard(id).await,
            _ => Ok(vec![self.get_object(artifact_type, id).await?]),
        }
    }

    async fn export_by_title(
        &self,
        artifact_type: ArtifactType,
        title: &str,
    ) -> Result<Vec<Artifact>, StoreError> {
        let found = self.find_by_title(artifact_type, title).await?;
        match artifact_type {
            ArtifactType::Dashboard => self.export_dashboard(&found.id).await,
            _ => Ok(vec![found]),
        }
    }

    async fn find_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Artifact, StoreError> {
        let type_name = artifact_type.as_str();
        self.scan(|o| o.type_name == type_name && o.id == id)
            .await?
            .ok_or_else(|| {
                let cause = format!("No {} found with ID: {}", artifact_type, id);
                tracing::error!("{}", cause);
                StoreError::NotFound(cause)
            })
    }

    async fn import_objects(
        &self,
        objects: Vec<Artifact>,
        force: bool,
    ) -> Result<ImportReport, StoreError> {
        let url = self.endpoint(&DASHBOARDS_PATH, &["import"])?;
        let body = serde_json::json!({ "objects": objects });
        let force_param = if force { "true" } else { "false" };

        let response = self
            .send(|| {
                self.http
                    .post(url.clone())
                    .query(&[("force", force_param)])
                    .json(&body)
            })
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Response(Self::error_body(response).await));
        }

        let envelope: ObjectsEnvelope = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;

        let mut report = ImportReport::default();
        for object in envelope.objects {
            let type_name = object
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = object
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            match object.get("error") {
                Some(error) => {
                    let message = error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string();
                    tracing::error!(object_type = %type_name, id = %id, %message, "Object not imported");
                    report.failed.push(ImportFailure {
                        type_name,
                        id,
                        message,
                    });
                }
                None => report.imported.push(ImportedObject { type_name, id }),
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            total = report.total(),
            "Objects imported"
        );
        Ok(report)
    }

    async fn find_all(&self) -> Result<Vec<Artifact>, StoreError> {
        let mut all = Vec::new();
        self.walk_pages(|objects| {
            all.extend(objects);
            ControlFlow::<()>::Continue(())
        })
        .await?;
        tracing::debug!(count = all.len(), "Store objects listed");
        Ok(all)
    }
}
