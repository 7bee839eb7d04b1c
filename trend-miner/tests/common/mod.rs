#![allow(dead_code)]

use axum::routing::get;
use axum::Router;

pub const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Stand-in for the image CDN: serves `/transient.png` on a random local port
/// and returns its URL.
pub async fn image_server() -> String {
    let app = Router::new().route("/transient.png", get(|| async { PNG_BYTES.to_vec() }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/transient.png", addr)
}
