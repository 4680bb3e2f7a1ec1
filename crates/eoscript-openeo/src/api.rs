use async_trait::async_trait;
use eoscript_graph::{GraphResult, ServiceInfo};

use crate::credential::Credential;
use crate::error::ClientError;
use crate::validation::ValidationIssue;

/// Tile-service operations used when publishing a run.
#[async_trait]
pub trait ServiceApi: Send + Sync {
  /// Create a tile service for `graph` and read back its tile url.
  async fn submit(&self, graph: &GraphResult, credential: &Credential) -> Result<ServiceInfo, ClientError>;

  /// Ask the API to validate `graph`. An empty list means it is valid.
  async fn validate(
    &self,
    graph: &GraphResult,
    credential: &Credential,
  ) -> Result<Vec<ValidationIssue>, ClientError>;

  /// Delete a service by its location.
  async fn delete(&self, location: &str, credential: &Credential) -> Result<(), ClientError>;
}
