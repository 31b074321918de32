//! HTTP transport.
//!
//! `POST /<operation>` with a JSON body. Responses are always status 200;
//! failures travel in the body as `{"error", "backtrace", "code"}`. An empty
//! body, or a `GET`, dispatches with a null payload.

use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{debug, error, info};

use mm_protocol::{RpcError, RpcRequest, RpcResponse};
use mm_server::RequestDispatcher;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Http(#[from] hyper::Error),
}

/// Bind a listener for `host:port`.
pub fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr = format!("{}:{}", host, port);
    let bind_error = |source| ServerError::Bind {
        addr: addr.clone(),
        source,
    };
    let listener = TcpListener::bind(&addr).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    Ok(listener)
}

/// Serve requests on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<RequestDispatcher>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), ServerError> {
    let local_addr: Option<SocketAddr> = listener.local_addr().ok();

    let make_svc = make_service_fn(move |_conn| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { Ok::<_, Infallible>(handle_request(dispatcher, req).await) }
            }))
        }
    });

    let server = hyper::Server::from_tcp(listener)?.serve(make_svc);
    if let Some(addr) = local_addr {
        info!(%addr, "measure manager listening");
    }
    server.with_graceful_shutdown(shutdown).await?;
    info!("measure manager stopped");
    Ok(())
}

/// Turn one HTTP request into a dispatcher call.
pub async fn handle_request(dispatcher: Arc<RequestDispatcher>, req: Request<Body>) -> Response<Body> {
    let op = req.uri().path().trim_matches('/').to_string();
    let method = req.method().clone();
    debug!(%method, %op, "request");

    let response = match read_request(op, &method, req.into_body()).await {
        Ok(request) => {
            match tokio::task::spawn_blocking(move || dispatcher.dispatch(&request)).await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "dispatch task failed");
                    RpcResponse::error(RpcError::internal(format!("dispatch task failed: {}", e)))
                }
            }
        }
        Err(e) => RpcResponse::error(e),
    };

    json_response(&response)
}

async fn read_request(op: String, method: &Method, body: Body) -> Result<RpcRequest, RpcError> {
    if method != Method::POST && method != Method::GET {
        return Err(RpcError::invalid_request(format!(
            "unsupported method {}, use POST",
            method
        )));
    }

    let bytes = hyper::body::to_bytes(body)
        .await
        .map_err(|e| RpcError::invalid_request(format!("failed to read body: {}", e)))?;
    let payload = if bytes.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| RpcError::invalid_request(format!("invalid JSON: {}", e)))?
    };
    Ok(RpcRequest::new(op, payload))
}

fn json_response(response: &RpcResponse) -> Response<Body> {
    let body = serde_json::to_vec(response).unwrap_or_else(|e| {
        format!(r#"{{"error":"failed to serialize response: {}","backtrace":"[]","code":"INTERNAL"}}"#, e)
            .into_bytes()
    });
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
    response
}
