//! Healthcheck endpoint (§2, §6), grounded on the teacher's
//! `healthcheck.rs`.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use sqlx::Executor;
use tokio::net::TcpListener;
use tracing::info;

use crate::db::DbPool;

pub async fn server(port: u16, db: DbPool) -> std::io::Result<()> {
    info!("healthcheck endpoint http://0.0.0.0:{}", port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let db = db.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| healthcheck(req, db.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("Healthcheck endpoint error: {:?}", err);
            }
        });
    }
}

async fn healthcheck(
    _: Request<hyper::body::Incoming>,
    db: DbPool,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let mut conn = db.acquire_shared().await;
    let up = conn.execute("SELECT 1").await.is_ok();
    drop(conn);

    let body = if up { "up" } else { "down" };
    let status = if up { 200 } else { 502 };

    let response = Response::builder()
        .header(hyper::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Healthcheck unavailable"))));

    Ok(response)
}
