use async_trait::async_trait;
use bollard::image::CreateImageOptions;
use bollard::models::CreateImageInfo;
use bollard::Docker;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::debug;

use super::{ProgressStream, RegistryClient, RegistryConnector, RegistryError};
use crate::credentials::AuthEnvelope;

/// Connects to the Docker daemon named by `DOCKER_HOST` (or the local socket)
#[derive(Debug, Default, Clone)]
pub struct DockerConnector;

impl DockerConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RegistryConnector for DockerConnector {
    async fn connect(&self) -> Result<Box<dyn RegistryClient>, RegistryError> {
        let docker =
            Docker::connect_with_defaults().map_err(|e| RegistryError::Connect(e.to_string()))?;

        let docker = docker.negotiate_version().await.map_err(|e| {
            RegistryError::Connect(format!("API version negotiation failed: {}", e))
        })?;

        Ok(Box::new(DockerClient { docker }))
    }
}

pub struct DockerClient {
    docker: Docker,
}

#[async_trait]
impl RegistryClient for DockerClient {
    async fn pull_image(
        &self,
        image: &str,
        auth: &AuthEnvelope,
    ) -> Result<ProgressStream, RegistryError> {
        let docker = self.docker.clone();
        let credentials = auth.to_docker_credentials();
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let image = image.to_string();

        debug!("Requesting pull of image: {}", image);

        let stream = async_stream::stream! {
            let pull = docker.create_image(Some(options), None, Some(credentials));
            let lines = progress_lines(image, pull);
            futures::pin_mut!(lines);

            while let Some(line) = lines.next().await {
                yield line;
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Turn daemon progress records into JSON lines.
///
/// The first record carrying an `error`, or the first transport error, ends the
/// stream with `RegistryError::Pull`.
fn progress_lines<S, E>(
    image: String,
    pull: S,
) -> impl Stream<Item = Result<String, RegistryError>>
where
    S: Stream<Item = Result<CreateImageInfo, E>>,
    E: Display,
{
    async_stream::stream! {
        futures::pin_mut!(pull);

        while let Some(result) = pull.next().await {
            match result {
                Ok(info) => {
                    if let Some(error) = info.error {
                        yield Err(RegistryError::Pull(format!("{}: {}", image, error)));
                        break;
                    }

                    match serde_json::to_string(&info) {
                        Ok(line) => yield Ok(line),
                        Err(e) => {
                            yield Err(RegistryError::Pull(format!(
                                "{}: unreadable progress record: {}",
                                image, e
                            )));
                            break;
                        }
                    }
                }
                Err(e) => {
                    yield Err(RegistryError::Pull(format!("{}: {}", image, e)));
                    break;
                }
            }
        }
    }
}
