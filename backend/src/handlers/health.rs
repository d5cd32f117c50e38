//! Health endpoint
//!
//! Reports overall status plus database reachability; load balancers only
//! read `status`, the rest is for humans.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

fn overall_status(database_reachable: bool) -> &'static str {
    if database_reachable {
        "ok"
    } else {
        "degraded"
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_reachable = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    Json(HealthResponse {
        status: overall_status(database_reachable),
        service: "sitebook-server",
        version: env!("CARGO_PKG_VERSION"),
        database: if database_reachable {
            "reachable"
        } else {
            "unreachable"
        },
    })
}
