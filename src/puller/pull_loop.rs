use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::RegistryConnector;
use crate::credentials::{CredentialError, CredentialResolver};

/// Keeps a fixed list of images pulled, one image at a time, forever
pub struct PullLoop<C> {
    images: Vec<String>,
    interval: Duration,
    resolver: CredentialResolver,
    connector: C,
}

/// Result of a single pass over the image list
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub pulled: usize,
    pub failed: usize,
    /// Cancellation stopped the cycle before every image was attempted
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LoopSummary {
    /// Cycles that ran to completion
    pub cycles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageOutcome {
    Pulled,
    Failed,
    Cancelled,
}

impl<C: RegistryConnector> PullLoop<C> {
    pub fn new(
        images: Vec<String>,
        interval: Duration,
        resolver: CredentialResolver,
        connector: C,
    ) -> Self {
        Self {
            images,
            interval,
            resolver,
            connector,
        }
    }

    /// Run pull cycles until `cancel` fires.
    ///
    /// Only a fatal credential error ends the loop early. Everything else is
    /// logged against the image it happened to and retried next cycle.
    pub async fn run<W>(
        &self,
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<LoopSummary, CredentialError>
    where
        W: AsyncWrite + Unpin,
    {
        info!(
            "Image pull loop started for {} image(s) (interval: {:?})",
            self.images.len(),
            self.interval
        );

        for image in &self.images {
            write_status(out, &format!("Keeping image pulled: {}", image)).await;
        }

        let mut summary = LoopSummary::default();

        while !cancel.is_cancelled() {
            if self.run_cycle(out, cancel).await?.interrupted {
                break;
            }
            summary.cycles += 1;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Image pull loop stopped after {} cycle(s)", summary.cycles);
        Ok(summary)
    }

    /// Pull every image once, in order
    pub async fn run_cycle<W>(
        &self,
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<CycleSummary, CredentialError>
    where
        W: AsyncWrite + Unpin,
    {
        let started_at = Utc::now();
        write_status(out, &format!("{} starting pull cycle", started_at.to_rfc3339())).await;

        let mut summary = CycleSummary {
            started_at,
            pulled: 0,
            failed: 0,
            interrupted: false,
        };

        for image in &self.images {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            match self.pull_image(image, out, cancel).await? {
                ImageOutcome::Pulled => summary.pulled += 1,
                ImageOutcome::Failed => summary.failed += 1,
                ImageOutcome::Cancelled => {
                    summary.interrupted = true;
                    break;
                }
            }
        }

        info!(
            "Pull cycle started at {} finished: {} pulled, {} failed",
            summary.started_at, summary.pulled, summary.failed
        );

        Ok(summary)
    }

    async fn pull_image<W>(
        &self,
        image: &str,
        out: &mut W,
        cancel: &CancellationToken,
    ) -> Result<ImageOutcome, CredentialError>
    where
        W: AsyncWrite + Unpin,
    {
        // Re-read per image so a rotated token is picked up mid-cycle
        let auth = match self.resolver.resolve().await {
            Ok(auth) => auth,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Skipping image {}: {}", image, e);
                return Ok(ImageOutcome::Failed);
            }
        };

        let client = match self.connector.connect().await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to create registry client for image {}: {}", image, e);
                return Ok(ImageOutcome::Failed);
            }
        };

        let mut progress = match client.pull_image(image, &auth).await {
            Ok(progress) => progress,
            Err(e) => {
                error!("Failed to request pull of image {}: {}", image, e);
                return Ok(ImageOutcome::Failed);
            }
        };

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Pull of image {} interrupted by shutdown", image);
                    return Ok(ImageOutcome::Cancelled);
                }
                next = progress.next() => next,
            };

            match next {
                Some(Ok(line)) => {
                    if let Err(e) = write_line(out, &line).await {
                        error!("Failed to forward pull progress for image {}: {}", image, e);
                        return Ok(ImageOutcome::Failed);
                    }
                }
                Some(Err(e)) => {
                    error!("Failed to pull image {}: {}", image, e);
                    return Ok(ImageOutcome::Failed);
                }
                None => break,
            }
        }

        debug!("Pull progress for image {} exhausted", image);
        Ok(ImageOutcome::Pulled)
    }
}

async fn write_line<W>(out: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(line.as_bytes()).await?;
    if !line.ends_with('\n') {
        out.write_all(b"\n").await?;
    }
    out.flush().await
}

async fn write_status<W>(out: &mut W, line: &str)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = write_line(out, line).await {
        warn!("Failed to write status line: {}", e);
    }
}
