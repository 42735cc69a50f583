use crate::config::Config;
use crate::errors::RelayError;
use crate::forwarder::Forwarder;
use crate::handler::RelayHandler;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::{PeerAddr, make_error_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Serves the relay endpoint, any method. Paths outside it get a 404.
#[derive(Clone)]
pub struct RelayService {
    endpoint: Arc<str>,
    handler: Arc<RelayHandler>,
}

impl RelayService {
    pub fn new(endpoint: &str, handler: RelayHandler) -> Self {
        Self {
            endpoint: endpoint.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let forwarder = Forwarder::new(config.identity.clone(), config.forwarder)?;
        let handler = RelayHandler::new(
            config.identity.clone(),
            config.workload.clone(),
            forwarder,
        );
        Ok(Self::new(&config.endpoint, handler))
    }
}

/// Whether `path` falls under `endpoint`. An endpoint ending in `/` covers
/// its whole subtree, so the default `/` matches every path.
pub fn endpoint_matches(endpoint: &str, path: &str) -> bool {
    if endpoint.ends_with('/') {
        path.starts_with(endpoint)
    } else {
        path == endpoint
    }
}

impl<B> Service<Request<B>> for RelayService
where
    B: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, RelayError>>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let handler = self.handler.clone();
        let matched = endpoint_matches(&self.endpoint, req.uri().path());
        let uri = req.uri().clone();
        let from = req
            .extensions()
            .get::<PeerAddr>()
            .map(|peer| peer.0.to_string())
            .unwrap_or_default();

        Box::pin(async move {
            if !matched {
                tracing::debug!(%uri, "request outside relay endpoint");
                return Ok(make_error_response(StatusCode::NOT_FOUND));
            }
            Ok(handler.respond(from, &uri).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::RecordingServer;
    use http_body_util::BodyExt;
    use std::net::SocketAddr;

    #[test]
    fn test_endpoint_matches() {
        assert!(endpoint_matches("/", "/"));
        assert!(endpoint_matches("/", "/any/path"));
        assert!(endpoint_matches("/relay/", "/relay/"));
        assert!(endpoint_matches("/relay/", "/relay/deeper"));
        assert!(!endpoint_matches("/relay/", "/other"));
        assert!(endpoint_matches("/relay", "/relay"));
        assert!(!endpoint_matches("/relay", "/relay/deeper"));
    }

    #[tokio::test]
    async fn test_call() {
        let mut server = RecordingServer::start(StatusCode::OK).await;
        let mut config = Config::new(server.url("/"), "npods-1".into());
        config.endpoint = "/relay".into();
        let service = RelayService::from_config(&config).unwrap();

        let peer: SocketAddr = "10.0.0.7:41000".parse().unwrap();
        let mut req = Request::post("/relay?pass=9&thread=xyz").body(()).unwrap();
        req.extensions_mut().insert(PeerAddr(peer));

        let response = service.call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["from"], "10.0.0.7:41000");
        assert_eq!(json["pass"], "10");
        assert_eq!(json["thread"], "xyz");
        assert_eq!(json["request"], "/relay?pass=9&thread=xyz");

        assert_eq!(server.next_request().await.uri, "/?pass=10&thread=xyz");
    }

    #[tokio::test]
    async fn test_call_outside_endpoint() {
        let mut config = Config::new("http://127.0.0.1:1/".parse().unwrap(), "npods-1".into());
        config.endpoint = "/relay".into();
        let service = RelayService::from_config(&config).unwrap();

        let response = service.call(Request::get("/elsewhere").body(()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
