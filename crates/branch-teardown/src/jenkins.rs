//! Job registry backed by the Jenkins HTTP API.
//!
//! - lookup: `GET  <base>/job/<name>/api/json`
//! - enqueue: `POST <base>/job/<name>/buildWithParameters`, parameters
//!   form-encoded in their fixed order; the `Location` header names the queue item.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{Result, TearDownError, TearDownParameters};
use crate::registry::{JobRegistry, JobSummary, QueueItem};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for a Jenkins controller.
#[derive(Debug, Clone)]
pub struct JenkinsConfig {
    /// Controller root URL (e.g. `https://ci.example.com/`)
    pub base_url: String,
    /// User for API token authentication
    pub user: Option<String>,
    /// API token for `user`
    pub api_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl JenkinsConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user: None,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Authenticate with a user and API token.
    pub fn with_credentials(mut self, user: impl Into<String>, api_token: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.api_token = Some(api_token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `JENKINS_URL` (required), `JENKINS_USER`, `JENKINS_API_TOKEN` and
    /// `JENKINS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("JENKINS_URL")
            .map_err(|_| TearDownError::Config("JENKINS_URL not set".to_string()))?;
        let timeout_secs = match std::env::var("JENKINS_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                TearDownError::Config(format!("JENKINS_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            user: std::env::var("JENKINS_USER").ok(),
            api_token: std::env::var("JENKINS_API_TOKEN").ok(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobApiResponse {
    name: String,
    #[serde(default = "default_buildable")]
    buildable: bool,
    #[serde(default = "default_next_build_number")]
    next_build_number: u64,
}

fn default_buildable() -> bool {
    true
}

fn default_next_build_number() -> u64 {
    1
}

/// [`JobRegistry`] talking to a Jenkins controller.
pub struct JenkinsRegistry {
    config: JenkinsConfig,
    base: Url,
    http_client: reqwest::Client,
}

impl JenkinsRegistry {
    pub fn new(config: JenkinsConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| TearDownError::Config(format!("invalid Jenkins URL {}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(TearDownError::Config(format!(
                "Jenkins URL cannot be a base: {}",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("branch-teardown/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            base,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(JenkinsConfig::from_env()?)
    }

    /// `<base>/job/<name>/<tail...>` with `name` percent-encoded as one segment.
    fn job_url(&self, name: &str, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("job").push(name).extend(tail);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(user, self.config.api_token.as_deref()),
            None => request,
        }
    }
}

#[async_trait]
impl JobRegistry for JenkinsRegistry {
    #[instrument(skip(self), name = "jenkins_find_job")]
    async fn find_top_level_job(&self, name: &str) -> Result<Option<JobSummary>> {
        let mut url = self.job_url(name, &["api", "json"]);
        url.query_pairs_mut()
            .append_pair("tree", "name,buildable,nextBuildNumber");

        let response = self
            .authorize(self.http_client.get(url))
            .send()
            .await
            .map_err(|e| TearDownError::Registry {
                job: name.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(job = %name, "job not present in Jenkins");
                Ok(None)
            }
            status if status.is_success() => {
                let job: JobApiResponse = response.json().await?;
                Ok(Some(JobSummary {
                    name: job.name,
                    buildable: job.buildable,
                    next_build_number: job.next_build_number,
                }))
            }
            status => Err(TearDownError::Registry {
                job: name.to_string(),
                reason: format!("unexpected status {status}"),
            }),
        }
    }

    #[instrument(skip(self, job, params), fields(job = %job.name), name = "jenkins_schedule_build")]
    async fn schedule_build(
        &self,
        job: &JobSummary,
        params: &TearDownParameters,
    ) -> Result<QueueItem> {
        if !job.buildable {
            return Err(TearDownError::EnqueueFailure {
                job: job.name.clone(),
                reason: "job is disabled".to_string(),
            });
        }

        let url = self.job_url(&job.name, &["buildWithParameters"]);
        let response = self
            .authorize(self.http_client.post(url.clone()))
            .form(&params.as_pairs()[..])
            .send()
            .await
            .map_err(|e| TearDownError::EnqueueFailure {
                job: job.name.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TearDownError::EnqueueFailure {
                job: job.name.clone(),
                reason: format!("status {status}: {}", body.trim()),
            });
        }

        let reference = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string());

        Ok(QueueItem {
            job_name: job.name.clone(),
            reference,
            enqueued_at: Utc::now(),
        })
    }
}
