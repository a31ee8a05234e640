//! HTTP server exposing /metrics and /healthz.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::collector::{DeviceProcessSource, UserResolver};
use crate::exporter::GpuUserExporter;

/// Serve the metrics endpoint until the process exits.
///
/// A bind failure propagates out and is the one fatal condition in the
/// system; everything else degrades per scrape.
pub async fn serve<S, R>(
    addr: SocketAddr,
    exporter: Arc<GpuUserExporter<S, R>>,
) -> Result<(), hyper::Error>
where
    S: DeviceProcessSource + 'static,
    R: UserResolver + 'static,
{
    let make_svc = make_service_fn(move |_| {
        let exporter = Arc::clone(&exporter);
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                let exporter = Arc::clone(&exporter);
                async move { Ok::<_, hyper::Error>(handle(req, &exporter).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!("metrics endpoint listening on http://{}/metrics", addr);
    server.await
}

async fn handle<S, R>(req: Request<Body>, exporter: &GpuUserExporter<S, R>) -> Response<Body>
where
    S: DeviceProcessSource + 'static,
    R: UserResolver + 'static,
{
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => match exporter.render().await {
            Ok(body) => Response::builder()
                .header("Content-Type", "text/plain; version=0.0.4")
                .body(Body::from(body))
                .unwrap(),
            Err(err) => {
                error!("metrics encoding failed: {err}");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from("encoding error\n"))
                    .unwrap()
            }
        },

        (&Method::GET, "/healthz") => Response::new(Body::from("ok\n")),

        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("not found\n"))
            .unwrap(),
    }
}
