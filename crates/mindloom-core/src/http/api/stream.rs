use axum::{
    Extension,
    extract::Path,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

use crate::AppCore;

/// GET /api/stream/{channel} - live fragments over SSE.
///
/// Bridges a relay subscription to the HTTP client. A subscriber that lags
/// behind the broadcast buffer skips the gap rather than erroring out.
pub async fn subscribe(
    Extension(core): Extension<Arc<AppCore>>,
    Path(channel): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = core.relay.subscribe(&channel);

    let stream = BroadcastStream::new(receiver).filter_map(|fragment| async move {
        match fragment {
            Ok(fragment) => Event::default()
                .json_data(&fragment)
                .ok()
                .map(Ok::<_, Infallible>),
            Err(_lagged) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
