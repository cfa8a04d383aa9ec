use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: String,
}

// GET /health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "admitchat relay is running".to_string(),
    })
}
