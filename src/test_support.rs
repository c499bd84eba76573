//! Throwaway local HTTP servers standing in for the remote sites.

use axum::{response::Html, routing::get, Router};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL (with trailing slash)
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// Serve a single static HTML page at `path`
pub async fn serve_html(path: &str, body: &'static str) -> String {
    serve(Router::new().route(path, get(move || async move { Html(body) }))).await
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}
