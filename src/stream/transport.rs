use async_trait::async_trait;
use futures::{stream::BoxStream, SinkExt, StreamExt};
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::TransportError;

pub type InboundStream = BoxStream<'static, Result<String, TransportError>>;

/// One open streaming connection.
///
/// Dropping it closes the connection: the inbound half goes away and the
/// outbound writer shuts down once its sender is released.
pub struct StreamConnection {
    pub inbound: InboundStream,
    pub outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<StreamConnection, TransportError>;
}

/// WebSocket transport for the `/ws` telemetry endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<StreamConnection, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        let (mut write, read) = ws_stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(err) = write.send(Message::Text(text.into())).await {
                    warn!("stream send failed: {err}");
                    break;
                }
            }
            let _ = write.close().await;
            debug!("stream writer finished");
        });

        let inbound = read
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(data)) => Some(Ok(String::from_utf8_lossy(&data).into_owned())),
                    Ok(Message::Close(frame)) => {
                        debug!("server closed stream: {frame:?}");
                        None
                    }
                    Ok(_) => None,
                    Err(err) => Some(Err(TransportError::Receive(err.to_string()))),
                }
            })
            .boxed();

        Ok(StreamConnection { inbound, outbound })
    }
}
