//! HTTP client for the mesos agent v1 operator API.
//!
//! The operator API is a single endpoint: every call is a JSON `POST` to
//! `{agent_url}/api/v1` whose body names the call type. The agent makes two
//! calls with very different costs:
//!
//! - `GET_CONTAINERS`: cheap, issued every gather cycle
//! - `GET_STATE`: expensive on busy agents, issued only when the metadata
//!   cache needs repair and the rate limiter allows it

mod wire;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{ContainerSample, StateSnapshot};
use wire::AgentResponse;

const GET_CONTAINERS: &str = "GET_CONTAINERS";
const GET_STATE: &str = "GET_STATE";

/// Configuration for the mesos agent client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the mesos agent, e.g. `http://localhost:5051`
    pub agent_url: String,
    /// Deadline applied to each request end to end
    pub fetch_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_url: "http://localhost:5051".to_string(),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Errors surfaced by the agent client
#[derive(Debug, Error)]
pub enum AgentError {
    /// Connection, I/O or body-decode failure
    #[error("transport failure talking to the mesos agent: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request ran past its deadline
    #[error("mesos agent call timed out after {0:?}")]
    Timeout(Duration),

    /// The response decoded but announced a different call type
    #[error("expected a {expected} response, got {got:?}")]
    UnexpectedResponse { expected: &'static str, got: String },

    /// The response type matched but the payload section was missing
    #[error("{0} response carried no payload")]
    EmptyResponse(&'static str),

    /// The configured agent URL does not parse
    #[error("invalid mesos agent url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Operator API surface the gatherer depends on.
///
/// `MesosClient` is the production implementation; tests substitute stubs.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// List the containers currently running on the agent, with their
    /// latest resource statistics.
    async fn fetch_containers(&self) -> Result<Vec<ContainerSample>, AgentError>;

    /// Fetch the agent's full task and framework state.
    async fn fetch_state(&self) -> Result<StateSnapshot, AgentError>;
}

/// Client for one mesos agent's operator API
pub struct MesosClient {
    http: reqwest::Client,
    endpoint: Url,
    fetch_timeout: Duration,
}

impl MesosClient {
    pub fn new(config: ClientConfig) -> Result<Self, AgentError> {
        let raw = format!("{}/api/v1", config.agent_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|source| AgentError::InvalidUrl {
            url: config.agent_url.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(AgentError::Transport)?;

        Ok(Self {
            http,
            endpoint,
            fetch_timeout: config.fetch_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn classify(&self, err: reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout(self.fetch_timeout)
        } else {
            AgentError::Transport(err)
        }
    }

    async fn call(&self, request_type: &'static str) -> Result<AgentResponse, AgentError> {
        debug!(request_type, endpoint = %self.endpoint, "Calling mesos agent");

        let body = serde_json::json!({ "type": request_type });
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?
            .error_for_status()
            .map_err(|e| self.classify(e))?;

        let decoded: AgentResponse = response.json().await.map_err(|e| self.classify(e))?;

        if decoded.response_type.as_deref() != Some(request_type) {
            return Err(AgentError::UnexpectedResponse {
                expected: request_type,
                got: decoded.response_type.unwrap_or_default(),
            });
        }
        Ok(decoded)
    }
}

#[async_trait]
impl AgentApi for MesosClient {
    async fn fetch_containers(&self) -> Result<Vec<ContainerSample>, AgentError> {
        let response = self.call(GET_CONTAINERS).await?;
        let payload = response
            .get_containers
            .ok_or(AgentError::EmptyResponse(GET_CONTAINERS))?;

        let samples: Vec<ContainerSample> = payload
            .containers
            .into_iter()
            .map(wire::WireContainer::into_sample)
            .collect();

        debug!(containers = samples.len(), "Fetched live containers");
        Ok(samples)
    }

    async fn fetch_state(&self) -> Result<StateSnapshot, AgentError> {
        let response = self.call(GET_STATE).await?;
        let payload = response
            .get_state
            .ok_or(AgentError::EmptyResponse(GET_STATE))?;

        let snapshot = payload.into_snapshot();
        debug!(
            tasks = snapshot.tasks.len(),
            frameworks = snapshot.frameworks.len(),
            "Fetched agent state"
        );
        Ok(snapshot)
    }
}
