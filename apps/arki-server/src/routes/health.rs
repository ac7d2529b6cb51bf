//! Health check endpoints

use axum::{response::Html, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

const BANNER: &str = r#"<!DOCTYPE html>
<html>
<head><title>ARKI PDF Server</title></head>
<body>
<h1>ARKI PDF Server</h1>
<p>Flattens and protects PDF documents.</p>
<ul>
<li><code>GET /api/health</code> - service status</li>
<li><code>POST /api/upload-pdf</code> - multipart field <code>pdf</code>, optional <code>mode</code> (<code>flatten</code> or <code>protect</code>)</li>
<li><code>GET /api/download/&lt;filename&gt;</code> - fetch a processed document</li>
</ul>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(BANNER)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "ARKI PDF Server is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
}
