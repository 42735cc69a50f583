use http::header::{CONNECTION, HOST, HeaderName};
use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

/// What a [`RecordingServer`] saw of one request.
#[derive(Debug)]
pub struct SeenRequest {
    pub method: Method,
    pub uri: String,
    pub host: Option<String>,
    pub connection: Option<String>,
}

impl SeenRequest {
    fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        SeenRequest {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            host: header(HOST),
            connection: header(CONNECTION),
        }
    }
}

/// Loopback HTTP server standing in for a next hop. Answers every request
/// with a fixed status and reports what it received.
pub struct RecordingServer {
    port: u16,
    requests: mpsc::UnboundedReceiver<SeenRequest>,
}

impl RecordingServer {
    pub async fn start(status: StatusCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        Self::serve(listener, status)
    }

    pub async fn start_on(port: u16, status: StatusCode) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("Failed to bind to address");
        Self::serve(listener, status)
    }

    /// Accepts connections but never answers on them.
    pub async fn start_stalled() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();
        let (_tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        RecordingServer { port, requests }
    }

    fn serve(listener: TcpListener, status: StatusCode) -> Self {
        let port = listener.local_addr().unwrap().port();
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                let service = service_fn(move |req: Request<Incoming>| {
                    let _ = tx.send(SeenRequest::from_request(&req));
                    async move {
                        let mut response = Response::new(Full::new(Bytes::from_static(b"ok")));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });

                tokio::spawn(async move {
                    let _ = Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        RecordingServer { port, requests }
    }

    /// A port nothing is listening on, at least for the moment.
    pub fn unused_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|addr| addr.port())
            .expect("Failed to find a free port")
    }

    pub fn url(&self, path_and_query: &str) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}{}", self.port, path_and_query))
            .expect("Failed to parse URL")
    }

    pub async fn next_request(&mut self) -> SeenRequest {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("no request within 5s")
            .expect("server stopped")
    }

    pub fn try_next_request(&mut self) -> Option<SeenRequest> {
        self.requests.try_recv().ok()
    }
}
