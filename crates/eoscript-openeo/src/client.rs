use std::time::Duration;

use async_trait::async_trait;
use eoscript_config::Settings;
use eoscript_graph::{GraphResult, ServiceInfo};
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::ServiceApi;
use crate::catalog::{Collection, CollectionList};
use crate::credential::Credential;
use crate::error::ClientError;
use crate::validation::ValidationIssue;

const CATALOG_ATTEMPTS: u32 = 3;

/// Body of `POST /services`.
#[derive(Debug, Serialize)]
struct ServiceRequest<'a> {
  title: &'a str,
  description: Option<&'a str>,
  #[serde(rename = "type")]
  kind: &'a str,
  enabled: bool,
  configuration: serde_json::Value,
  plan: Option<&'a str>,
  budget: Option<f64>,
  process: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
  #[serde(default)]
  errors: Vec<ValidationIssue>,
}

/// Client for one openEO API.
#[derive(Debug, Clone)]
pub struct OpenEoClient {
  http: Client,
  api_url: String,
  origin: Url,
  auth_prefix: String,
  service_title: String,
  retry_backoff: Duration,
}

impl OpenEoClient {
  /// Create a client for the API at `api_url`.
  pub fn new(api_url: &str) -> Result<Self, ClientError> {
    Self::build(api_url, None)
  }

  /// Create a client from application settings.
  pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
    let mut client = Self::build(
      &settings.api_url,
      settings.request_timeout_ms.map(Duration::from_millis),
    )?;
    client.auth_prefix = settings.auth_prefix.clone();
    client.service_title = settings.service_title.clone();
    Ok(client)
  }

  fn build(api_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
    let api_url = api_url.trim_end_matches('/').to_string();
    let origin = Url::parse(&api_url).map_err(|e| ClientError::InvalidUrl {
      url: api_url.clone(),
      message: e.to_string(),
    })?;

    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    let defaults = Settings::default();
    Ok(Self {
      http: builder.build()?,
      api_url,
      origin,
      auth_prefix: defaults.auth_prefix,
      service_title: defaults.service_title,
      retry_backoff: Duration::from_millis(250),
    })
  }

  /// Base delay between catalog attempts; grows linearly per attempt.
  pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
    self.retry_backoff = backoff;
    self
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.api_url, path)
  }

  /// Resolve a `location` header, which may be relative to the API origin.
  fn resolve(&self, location: &str) -> Result<Url, ClientError> {
    self.origin.join(location).map_err(|e| ClientError::InvalidUrl {
      url: location.to_string(),
      message: e.to_string(),
    })
  }

  fn authorize(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
    request.header(
      AUTHORIZATION,
      format!("{}{}", self.auth_prefix, credential.token()),
    )
  }

  /// List all collections.
  pub async fn list_collections(
    &self,
    credential: Option<&Credential>,
  ) -> Result<CollectionList, ClientError> {
    self
      .get_catalog(&self.endpoint("collections"), credential)
      .await
  }

  /// Fetch one collection with its band summaries.
  pub async fn get_collection(
    &self,
    id: &str,
    credential: Option<&Credential>,
  ) -> Result<Collection, ClientError> {
    self
      .get_catalog(&self.endpoint(&format!("collections/{}", id)), credential)
      .await
  }

  #[instrument(name = "catalog_get", skip(self, credential))]
  async fn get_catalog<T: DeserializeOwned>(
    &self,
    url: &str,
    credential: Option<&Credential>,
  ) -> Result<T, ClientError> {
    let mut attempt = 1;
    loop {
      match self.try_get_catalog(url, credential).await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_retryable() && attempt < CATALOG_ATTEMPTS => {
          warn!(attempt, error = %e, "catalog request failed, retrying");
          tokio::time::sleep(self.retry_backoff * attempt).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn try_get_catalog<T: DeserializeOwned>(
    &self,
    url: &str,
    credential: Option<&Credential>,
  ) -> Result<T, ClientError> {
    let mut request = self.http.get(url);
    if let Some(credential) = credential {
      request = self.authorize(request, credential);
    }
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(ClientError::Status {
        context: "catalog request",
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("unknown status").to_string(),
      });
    }
    decode(response).await
  }
}

#[async_trait]
impl ServiceApi for OpenEoClient {
  #[instrument(name = "service_submit", skip(self, graph, credential), fields(graph = %graph.name))]
  async fn submit(&self, graph: &GraphResult, credential: &Credential) -> Result<ServiceInfo, ClientError> {
    let body = ServiceRequest {
      title: &self.service_title,
      description: None,
      kind: "XYZ",
      enabled: true,
      configuration: serde_json::json!({ "scope": "public" }),
      plan: None,
      budget: None,
      process: graph.process(),
    };

    let response = self
      .authorize(self.http.post(self.endpoint("services")), credential)
      .json(&body)
      .send()
      .await?;
    let response = submission_ok(response).await?;

    let location = response
      .headers()
      .get(LOCATION)
      .and_then(|value| value.to_str().ok())
      .filter(|value| !value.is_empty())
      .map(str::to_string)
      .ok_or(ClientError::MissingLocation)?;
    info!(location = %location, "service created");

    let details = self
      .authorize(self.http.get(self.resolve(&location)?), credential)
      .send()
      .await?;
    let details: serde_json::Value = decode(submission_ok(details).await?).await?;

    let tile_url = details
      .get("url")
      .and_then(serde_json::Value::as_str)
      .ok_or(ClientError::MissingTileUrl)?
      .to_string();

    Ok(ServiceInfo {
      id: uuid::Uuid::new_v4().to_string(),
      location,
      tile_url,
      visible: graph.visible,
      graph_result: graph.clone(),
    })
  }

  #[instrument(name = "graph_validate", skip(self, graph, credential), fields(graph = %graph.name))]
  async fn validate(
    &self,
    graph: &GraphResult,
    credential: &Credential,
  ) -> Result<Vec<ValidationIssue>, ClientError> {
    let response = self
      .authorize(self.http.post(self.endpoint("validation")), credential)
      .json(&graph.process())
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(ClientError::Status {
        context: "validation request",
        status: status.as_u16(),
        message: response.text().await.unwrap_or_default(),
      });
    }
    let payload: ValidationResponse = decode(response).await?;
    Ok(payload.errors)
  }

  #[instrument(name = "service_delete", skip(self, credential))]
  async fn delete(&self, location: &str, credential: &Credential) -> Result<(), ClientError> {
    let response = self
      .authorize(self.http.delete(self.resolve(location)?), credential)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(ClientError::Status {
        context: "service deletion",
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("unknown status").to_string(),
      });
    }
    Ok(())
  }
}

async fn submission_ok(response: Response) -> Result<Response, ClientError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  Err(ClientError::Submission {
    status: status.as_u16(),
    body: response.text().await.unwrap_or_default(),
  })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
  let body = response.bytes().await?;
  serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
    message: e.to_string(),
  })
}
