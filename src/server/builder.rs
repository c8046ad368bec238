// src/server/builder.rs
use anyhow::{Context, Result};
use hyper::{server::conn::Http, Body, Request, Response};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Service;

// Pause after resource errors such as EMFILE so the loop does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Builder pattern so `main.rs` can inject the health handler (or any other).
pub struct ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    addr: SocketAddr,
    handler: Option<H>,
}

impl<H> ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, handler: None }
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Binds the listener and accepts connections until `shutdown` resolves.
    ///
    /// Failed accepts are logged and skipped. Connections already accepted
    /// are not drained: their tasks keep running on the runtime after this
    /// returns, and go away with it.
    pub async fn serve_with_shutdown<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let handler = self
            .handler
            .context("handler must be set via with_handler()")?;

        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        tracing::info!("HTTP server listening on {}", self.addr);

        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut shutdown => {
                    tracing::info!("HTTP server on {} stopped accepting connections", self.addr);
                    return Ok(());
                }
            };
            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(err) if is_connection_error(&err) => {
                    tracing::debug!(%err, "connection dropped before accept");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%err, "accept failed, retrying in {:?}", ACCEPT_BACKOFF);
                    tokio::select! {
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                        _ = &mut shutdown => return Ok(()),
                    }
                }
            };
            let svc = handler.clone();

            // One task per connection.
            tokio::spawn(async move {
                let http = Http::new();
                if let Err(err) = http.serve_connection(stream, svc).await {
                    tracing::warn!(%peer, %err, "connection error");
                }
            });
        }
    }
}

// Errors about one peer, not about the listener.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;
    use std::convert::Infallible;
    use tokio::sync::oneshot;

    fn free_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn test_peer_errors_are_not_fatal() {
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_connection_error(&io::Error::new(
            io::ErrorKind::Other,
            "Too many open files"
        )));
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let addr = free_addr();
        let handler = tower::service_fn(|_req: Request<Body>| async {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NO_CONTENT;
            Ok::<_, Infallible>(response)
        });
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(
            ServerBuilder::new(addr)
                .with_handler(handler)
                .serve_with_shutdown(async {
                    let _ = stopped.await;
                }),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = reqwest::Client::new();
        for _ in 0..2 {
            let response = client.get(format!("http://{}/", addr)).send().await.unwrap();
            assert_eq!(response.status().as_u16(), 204);
        }

        stop.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }
}
