//! Line-oriented turn detection server
//!
//! Reads JSON-lines zone events, feeds them through the partitioned
//! pipeline and writes one JSON line per output record.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::api;
use crate::config::PipelineConfig;
use crate::pipeline::{Pipeline, PipelineOutput, PipelineStats, StatsSnapshot};
use crate::state_store::SnapshotManager;
use crate::types::{EventParseError, TurnResult, ZoneEvent};

/// Turn detection server over an input and an output stream
pub struct TurnServer {
    config: PipelineConfig,
}

impl TurnServer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over stdin/stdout until end of input or Ctrl+C
    pub async fn run(&self) -> TurnResult<StatsSnapshot> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        ctrlc::set_handler(move || {
            let _ = shutdown_tx.send(true);
        })?;

        let input = BufReader::new(tokio::io::stdin());
        let output = BufWriter::new(tokio::io::stdout());
        let (stats, _) = self.serve(input, output, shutdown_rx).await?;
        Ok(stats)
    }

    /// Process `input` until it ends or `shutdown` flips to true
    ///
    /// Returns the final counters and the output stream.
    pub async fn serve<R, W>(
        &self,
        input: R,
        output: W,
        mut shutdown: watch::Receiver<bool>,
    ) -> TurnResult<(StatsSnapshot, W)>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let listener = match self.config.http_addr {
            Some(addr) => Some(api::bind(addr).await?),
            None => None,
        };

        let snapshots = self.config.data_dir.as_ref().map(SnapshotManager::new);
        let restored = match &snapshots {
            Some(manager) => match manager.load()? {
                Some((meta, entries)) => {
                    info!(
                        entries = entries.len(),
                        created_at = meta.created_at,
                        "restored store snapshot"
                    );
                    entries
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let (pipeline, outputs) = Pipeline::start(&self.config, restored);
        let stats = pipeline.stats();
        let writer = tokio::spawn(write_outputs(outputs, output));

        let http = listener.map(|listener| api::spawn_server(listener, stats.clone()));

        let mut lines = LinesStream::new(input.lines());
        loop {
            tokio::select! {
                Ok(()) = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown requested");
                        break;
                    }
                }

                line = lines.next() => {
                    match line {
                        Some(Ok(line)) => submit_line(&pipeline, &stats, &line).await?,
                        Some(Err(e)) => {
                            error!(error = %e, "failed to read input");
                            break;
                        }
                        None => {
                            debug!("end of input");
                            break;
                        }
                    }
                }
            }
        }

        let entries = pipeline.shutdown().await;
        let output = writer.await??;
        if let Some(http) = http {
            http.abort();
        }

        if let Some(manager) = &snapshots {
            manager.save(&entries)?;
        }

        let summary = stats.snapshot();
        info!(
            events = summary.events,
            rejected = summary.rejected,
            turns = summary.turns,
            "server stopped"
        );
        Ok((summary, output))
    }
}

async fn submit_line(pipeline: &Pipeline, stats: &PipelineStats, line: &str) -> TurnResult<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    match ZoneEvent::from_json_line(line) {
        Ok(event) => pipeline.submit(event).await?,
        Err(e @ EventParseError::UnknownRelation(_)) => {
            error!(error = %e, "unrecognized relation, event dropped");
            stats.record_rejected();
        }
        Err(e) => {
            warn!(error = %e, input = line, "malformed event, skipped");
            stats.record_rejected();
        }
    }
    Ok(())
}

/// Write every output record as a JSON line, flushing after each one
async fn write_outputs<W>(
    mut rx: mpsc::Receiver<PipelineOutput>,
    mut output: W,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(record) = rx.recv().await {
        let line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to serialize output");
                continue;
            }
        };
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(output)
}
