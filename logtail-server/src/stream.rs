//! Server-Sent Events stream of one deployment log.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Lines buffered between the tail task and the HTTP body.
const LINE_BUFFER: usize = 16;

/// GET /deployment/{token} - stream the log, one `log` event per line.
///
/// A final `end` event is sent once every line the producer will ever write has
/// been delivered. Unknown tokens fail with 404 before any body is written.
pub async fn deployment_logs(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let tailer = state.deployer.tail(&token).await?;
    let token = tailer.token();
    let (mut rx, tail_task) = tailer.spawn(LINE_BUFFER);

    let stream = async_stream::stream! {
        while let Some(line) = rx.recv().await {
            yield Ok(Event::default().event("log").data(line));
        }

        match tail_task.await {
            Ok(end) if end.is_complete() => {
                yield Ok(Event::default().event("end").data(token.to_string()));
            }
            Ok(end) => {
                debug!(token = %token, ?end, "stream closed before completion");
            }
            Err(e) => {
                warn!(token = %token, error = %e, "tail task aborted");
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
