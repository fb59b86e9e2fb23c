//! Progress stream
//!
//! Runs a turn in the background and yields its progress as an ordered
//! event sequence: `start` first, then the agent's events in emission order,
//! then exactly one terminal event (`complete` or `error`), after which the
//! stream ends.

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::error;

use crate::agent::{Orchestrator, ProgressEvent, ProgressSink};

pub struct ProgressStream;

impl ProgressStream {
    /// Start answering `input` and return its progress events
    pub fn open(
        orchestrator: Arc<Orchestrator>,
        input: String,
    ) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let (sink, rx) = ProgressSink::channel();
        sink.emit(ProgressEvent::Started);

        let turn_sink = sink.clone();
        let turn = tokio::spawn(async move {
            orchestrator.run_with_progress(&input, &turn_sink).await
        });

        // The turn's sink is dropped when the turn ends, so the terminal event
        // is the last one sent and closes the channel.
        tokio::spawn(async move {
            let terminal = match turn.await {
                Ok(reply) => ProgressEvent::Complete(reply),
                Err(e) => {
                    error!(error = %e, "Streamed turn failed");
                    ProgressEvent::Error(e.to_string())
                }
            };
            sink.emit(terminal);
        });

        UnboundedReceiverStream::new(rx)
    }

    /// [`open`](Self::open) framed as server-sent events
    pub fn open_sse(
        orchestrator: Arc<Orchestrator>,
        input: String,
    ) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        Self::open(orchestrator, input).map(|event| Ok(to_sse_event(&event)))
    }
}

pub fn to_sse_event(event: &ProgressEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.data().to_string())
}
