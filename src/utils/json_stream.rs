use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

/// Write half of a chunked response body. Each call appends one frame; the
/// body ends when the last sender is dropped.
pub struct JsonStreamSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl JsonStreamSender {
    pub fn send_json(&self, value: &serde_json::Value) {
        if let Err(err) = self.tx.send(Bytes::from(value.to_string())) {
            warn!(error = %err, "json stream send failed");
        }
    }
}

pub fn json_stream_channel() -> (Body, JsonStreamSender) {
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, std::convert::Infallible>);
    (Body::from_stream(stream), JsonStreamSender { tx })
}
