use std::sync::Arc;

use async_trait::async_trait;
use futures::{AsyncRead, AsyncReadExt};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logs::{LineAssembler, LogAggregator};
use crate::types::{LogLine, StreamOptions, TailRequest, TailSummary};

/// Chunk size for each blocking stream read
const READ_BUF_SIZE: usize = 2048;

/// One pod's raw log byte stream
pub type LogReader = Box<dyn AsyncRead + Send + Unpin>;

/// The narrow seam to whatever supplies raw log bytes per pod.
///
/// The engine passes container, follow, and tail-count through unmodified;
/// honoring them (in particular "start from the last N lines") is entirely
/// the transport's job.
#[async_trait]
pub trait LogTransport: Send + Sync {
    async fn open(&self, pod: &str, options: &StreamOptions) -> anyhow::Result<LogReader>;
}

/// Failure of a single pod's stream; never fatal to sibling streams
#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to open log stream for pod {pod}: {cause:#}")]
    OpenStream { pod: String, cause: anyhow::Error },

    #[error("log stream read failed for pod {pod}: {cause}")]
    ReadStream { pod: String, cause: std::io::Error },
}

impl TailError {
    pub fn pod(&self) -> &str {
        match self {
            Self::OpenStream { pod, .. } | Self::ReadStream { pod, .. } => pod,
        }
    }
}

/// Fans one tail request out to a worker task per pod and joins them all.
pub struct TailController {
    transport: Arc<dyn LogTransport>,
    aggregator: Arc<LogAggregator>,
    cancel: CancellationToken,
}

impl TailController {
    pub fn new(
        transport: Arc<dyn LogTransport>,
        aggregator: Arc<LogAggregator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            aggregator,
            cancel,
        }
    }

    /// Run one invocation to completion.
    ///
    /// Spawns one worker per source and waits for every worker to finish.
    /// With no sources this is an immediate no-op, not an error. In follow
    /// mode workers run until their streams end or the cancellation token
    /// fires; a failed worker never stops its siblings.
    pub async fn run(&self, request: &TailRequest) -> TailSummary {
        let options = request.stream_options();
        let mut workers: JoinSet<Result<(), TailError>> = JoinSet::new();

        for pod in &request.sources {
            let transport = Arc::clone(&self.transport);
            let aggregator = Arc::clone(&self.aggregator);
            let cancel = self.cancel.clone();
            let pod = pod.clone();
            let options = options.clone();

            workers.spawn(async move {
                stream_pod_logs(transport, aggregator, cancel, pod, options).await
            });
        }

        let mut summary = TailSummary {
            started: request.sources.len(),
            failed: 0,
        };

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(pod = e.pod(), "{e}");
                    summary.failed += 1;
                }
                Err(e) => {
                    // Worker panicked; count it against the invocation.
                    warn!("log worker task failed: {e}");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Drive one pod's stream end to end: open, read chunks, assemble lines,
/// submit each line as it completes. The reader is dropped on every exit
/// path, including failure and cancellation.
async fn stream_pod_logs(
    transport: Arc<dyn LogTransport>,
    aggregator: Arc<LogAggregator>,
    cancel: CancellationToken,
    pod: String,
    options: StreamOptions,
) -> Result<(), TailError> {
    let mut reader = transport
        .open(&pod, &options)
        .await
        .map_err(|cause| TailError::OpenStream {
            pod: pod.clone(),
            cause,
        })?;

    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(pod = %pod, "stream cancelled");
                return Ok(());
            }

            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    for text in assembler.feed(&buf[..n]) {
                        aggregator.submit(&LogLine::new(pod.clone(), text));
                    }
                }
                Err(cause) => {
                    return Err(TailError::ReadStream { pod, cause });
                }
            }
        }
    }

    // Stream ended without a trailing newline: emit the leftover fragment
    // rather than dropping the pod's last line.
    if let Some(text) = assembler.finish() {
        aggregator.submit(&LogLine::new(pod.clone(), text));
    }

    debug!(pod = %pod, "stream ended");
    Ok(())
}
