//! Task API client.
//!
//! Two remote operations: create a task from a prompt, and fetch a task's
//! status. [`TaskApi`] is the seam the poller and coordinator are written
//! against; [`ManusClient`] is the reqwest implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use presale_core::RelaySettings;
use presale_models::{PayloadNode, TaskHandle, TaskState, TaskStatus};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::{RelayError, Result};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "API_KEY";

/// Remote task operations.
///
/// No retries happen at this layer; retry policy belongs to the caller.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Creates a task and returns its handle.
    ///
    /// Fails with `Transport` on network failure and `RemoteRejection` when
    /// the remote answers with a non-success status or no task identifier.
    async fn create_task(&self, prompt: &str, project_id: &str, profile: &str)
        -> Result<TaskHandle>;

    /// Fetches the current status of a task.
    ///
    /// A non-success HTTP status is reported as `TaskStatus::Failed`, not as
    /// an error; only transport-level problems are errors.
    async fn get_task_status(&self, handle: &TaskHandle) -> Result<TaskStatus>;
}

/// Pulls the task identifier out of a create response.
pub type IdExtractor = Arc<dyn Fn(&PayloadNode) -> Option<String> + Send + Sync>;

/// Builds an extractor that tries `keys` in order on the top-level object.
///
/// String values are used as-is (when non-blank); integer values are
/// rendered in decimal.
pub fn id_from_keys<I, S>(keys: I) -> IdExtractor
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Arc::new(move |body: &PayloadNode| {
        keys.iter().find_map(|key| {
            let value = body.get(key)?;
            if let Some(s) = value.as_str() {
                let s = s.trim();
                return (!s.is_empty()).then(|| s.to_string());
            }
            match value {
                PayloadNode::Scalar(presale_models::Scalar::Number(n))
                    if n.is_u64() || n.is_i64() =>
                {
                    Some(n.to_string())
                }
                _ => None,
            }
        })
    })
}

/// Interprets a status response body.
///
/// Unknown or missing status tags count as running. The whole body becomes
/// the result payload on completion.
pub fn parse_status(body: PayloadNode) -> TaskStatus {
    let state = TaskState::from_tag(body.get_str("status"));
    match state {
        TaskState::Completed => TaskStatus::Completed { payload: body },
        TaskState::Failed => TaskStatus::Failed {
            reason: body
                .get_str("error")
                .or_else(|| body.get_str("message"))
                .map(String::from),
        },
        other => {
            let progress = body.get("progress").and_then(|p| {
                p.as_f64()
                    .or_else(|| p.as_str().and_then(|s| s.trim().trim_end_matches('%').parse().ok()))
                    .and_then(TaskStatus::clamp_progress)
            });
            TaskStatus::from_state(other, progress)
        }
    }
}

/// Create-task request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    prompt: &'a str,
    project_id: &'a str,
    agent_profile: &'a str,
}

/// Task API client over HTTP.
#[derive(Clone)]
pub struct ManusClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    extract_id: IdExtractor,
}

impl fmt::Debug for ManusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManusClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ManusClient {
    /// Creates a client.
    ///
    /// `request_timeout` bounds every request. The task id is looked up
    /// under `id`, then `task_id`, unless replaced with
    /// [`with_id_extractor`](Self::with_id_extractor).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            extract_id: id_from_keys(["id", "task_id"]),
        })
    }

    /// Creates a client from relay settings.
    pub fn from_settings(settings: &RelaySettings, request_timeout: Duration) -> Result<Self> {
        Ok(Self::new(&settings.base_url, &settings.api_key, request_timeout)?
            .with_id_extractor(id_from_keys(settings.task_id_keys.clone())))
    }

    /// Replaces the task-id extractor.
    pub fn with_id_extractor(mut self, extract_id: IdExtractor) -> Self {
        self.extract_id = extract_id;
        self
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/v1/tasks", self.base_url)
    }
}

#[async_trait]
impl TaskApi for ManusClient {
    async fn create_task(
        &self,
        prompt: &str,
        project_id: &str,
        profile: &str,
    ) -> Result<TaskHandle> {
        let request = CreateTaskRequest {
            prompt,
            project_id,
            agent_profile: profile,
        };

        trace!(project_id, profile, prompt_len = prompt.len(), "creating task");

        let response = self
            .client
            .post(self.tasks_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::RemoteRejection(format!(
                "create returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            RelayError::RemoteRejection(format!("unreadable create response: {}", e))
        })?;
        let body = PayloadNode::from(body);

        let id = (self.extract_id)(&body).ok_or_else(|| {
            RelayError::RemoteRejection("create response carried no task identifier".into())
        })?;

        info!(task_id = %id, "task created");
        Ok(TaskHandle::from(id))
    }

    async fn get_task_status(&self, handle: &TaskHandle) -> Result<TaskStatus> {
        let url = format!("{}/{}", self.tasks_url(), handle);

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(task_id = %handle, status = status.as_u16(), "status request rejected");
            let reason = if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), text.trim())
            };
            return Ok(TaskStatus::Failed {
                reason: Some(reason),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let parsed = parse_status(PayloadNode::from(body));
        debug!(task_id = %handle, state = %parsed.state(), "status received");
        Ok(parsed)
    }
}
