use crate::http::make_error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Liveness and readiness endpoints for orchestrator probes.
pub struct AdminService<F, E> {
    is_ready: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> AdminService<F, E>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self {
            is_ready,
            _error: PhantomData,
        }
    }
}

impl<F, E> Service<Request<Incoming>> for AdminService<F, E>
where
    F: Fn() -> bool + Send + Sync + 'static,
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let is_ready = (self.is_ready)();

        Box::pin(async move { Ok(admin_response(req.method(), req.uri().path(), is_ready)) })
    }
}

fn admin_response<E: 'static>(
    method: &Method,
    path: &str,
    is_ready: bool,
) -> Response<BoxBody<Bytes, E>> {
    let ok_body = || Full::new(Bytes::from("ok\n")).map_err(|e| match e {}).boxed();

    if method != Method::GET && method != Method::HEAD {
        return make_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    match path {
        "/health" => Response::new(ok_body()),
        "/ready" => match is_ready {
            true => Response::new(ok_body()),
            false => make_error_response(StatusCode::SERVICE_UNAVAILABLE),
        },
        _ => make_error_response(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_admin_routes() {
        let health = admin_response::<Infallible>(&Method::GET, "/health", false);
        assert_eq!(health.status(), StatusCode::OK);

        let ready = admin_response::<Infallible>(&Method::GET, "/ready", true);
        assert_eq!(ready.status(), StatusCode::OK);

        let not_ready = admin_response::<Infallible>(&Method::GET, "/ready", false);
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);

        let missing = admin_response::<Infallible>(&Method::GET, "/metrics", true);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let post = admin_response::<Infallible>(&Method::POST, "/health", true);
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
