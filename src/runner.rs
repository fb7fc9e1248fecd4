//! Drives the configured pipelines over a stream of events.
//!
//! Pipelines run in configuration order and each one's output is put back into
//! the event under the pipeline name, so a later pipeline can test against an
//! earlier pipeline's cleaned collection.

use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    engine::{
        cleaner::CleaningEngine,
        types::{CleaningSummary, PipelineConfig},
    },
    error::{CleaningError, configuration_error},
    event::{
        ports::ResultSink,
        types::{CollectionLabel, Event, EventId, PhysicsObject},
    },
    overlap::registry::OverlapTestRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOutput {
    pub event_id: EventId,
    pub collections: BTreeMap<CollectionLabel, Vec<PhysicsObject>>,
    #[serde(skip)]
    pub summaries: Vec<CleaningSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamReport {
    pub events_read: u64,
    pub events_written: u64,
    pub events_skipped: u64,
    pub interrupted: bool,
}

pub struct CleaningRunner {
    engines: Vec<CleaningEngine<PhysicsObject>>,
}

impl CleaningRunner {
    pub fn from_pipelines(
        pipelines: &[PipelineConfig],
        registry: &OverlapTestRegistry,
    ) -> Result<Self, CleaningError> {
        let mut seen = BTreeSet::new();
        for pipeline in pipelines {
            if !seen.insert(pipeline.name.as_str()) {
                return Err(configuration_error(format!(
                    "duplicate pipeline name: {}",
                    pipeline.name
                )));
            }
        }

        let engines = pipelines
            .iter()
            .map(|pipeline| CleaningEngine::from_config(pipeline, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { engines })
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    /// Runs every pipeline on `event`. The event is consumed, so a failure in any
    /// pipeline leaves nothing behind.
    pub fn process(&mut self, mut event: Event) -> Result<EventOutput, CleaningError> {
        let event_id = event.id;
        let mut summaries = Vec::with_capacity(self.engines.len());

        for engine in &mut self.engines {
            let outcome = engine.clean(&event)?;
            event.commit(event_id, engine.name(), outcome.objects);
            summaries.push(outcome.summary);
        }

        let collections = self
            .engines
            .iter()
            .filter_map(|engine| {
                event
                    .take_collection(engine.name())
                    .map(|objects| (engine.name().to_string(), objects))
            })
            .collect();

        Ok(EventOutput {
            event_id,
            collections,
            summaries,
        })
    }
}

/// Reads NDJSON events from `reader`, writes one NDJSON output line per
/// successful event to `writer`, and stops early once `shutdown` resolves.
/// `writer` is flushed on every exit, errors included.
pub async fn run_stream<R, W, F>(
    runner: &mut CleaningRunner,
    reader: R,
    writer: &mut W,
    policy: EventErrorPolicy,
    shutdown: F,
) -> Result<StreamReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
    F: Future<Output = ()>,
{
    let mut report = StreamReport::default();
    let pumped = pump_events(runner, reader, writer, policy, shutdown, &mut report).await;
    let flushed = writer.flush().await.context("failed to flush event output");

    tracing::info!(
        target: "runner",
        events_read = report.events_read,
        events_written = report.events_written,
        events_skipped = report.events_skipped,
        interrupted = report.interrupted,
        succeeded = pumped.is_ok() && flushed.is_ok(),
        "stream_finished"
    );
    pumped.and(flushed)?;
    Ok(report)
}

async fn pump_events<R, W, F>(
    runner: &mut CleaningRunner,
    reader: R,
    writer: &mut W,
    policy: EventErrorPolicy,
    shutdown: F,
    report: &mut StreamReport,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
    F: Future<Output = ()>,
{
    let mut lines = reader.lines();
    let mut line_no: u64 = 0;
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                report.interrupted = true;
                return Ok(());
            }
            line = lines.next_line() => line.context("failed to read event stream")?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(&line)
            .with_context(|| format!("malformed event on line {line_no}"))?;
        let event_id = event.id;
        report.events_read += 1;

        match runner.process(event) {
            Ok(output) => {
                for summary in &output.summaries {
                    tracing::debug!(target: "runner", event_id, summary = ?summary, "pipeline_summary");
                }
                let mut encoded =
                    serde_json::to_vec(&output).context("failed to encode event output")?;
                encoded.push(b'\n');
                writer
                    .write_all(&encoded)
                    .await
                    .context("failed to write event output")?;
                report.events_written += 1;
            }
            Err(err) => match policy {
                EventErrorPolicy::Abort => {
                    tracing::error!(target: "runner", event_id, error = %err, "event_failed");
                    return Err(anyhow::Error::new(err).context(format!("event {event_id} failed")));
                }
                EventErrorPolicy::Skip => {
                    tracing::warn!(target: "runner", event_id, error = %err, "event_skipped");
                    report.events_skipped += 1;
                }
            },
        }
    }
}
