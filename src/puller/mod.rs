pub mod docker;
pub mod pull_loop;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::credentials::AuthEnvelope;

pub use docker::DockerConnector;
pub use pull_loop::PullLoop;

/// Pull progress records, one serialized line per item
pub type ProgressStream = BoxStream<'static, Result<String, RegistryError>>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to connect to container runtime: {0}")]
    Connect(String),

    #[error("Image pull failed: {0}")]
    Pull(String),
}

/// Creates registry clients from the process environment
///
/// A fresh client is requested for every image so a restarted daemon or a
/// changed endpoint is picked up without restarting the puller.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RegistryClient>, RegistryError>;
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Start pulling `image`, authenticating with `auth`
    ///
    /// Failures that happen after the request was accepted are reported as
    /// `Err` items on the returned stream.
    async fn pull_image(
        &self,
        image: &str,
        auth: &AuthEnvelope,
    ) -> Result<ProgressStream, RegistryError>;
}
