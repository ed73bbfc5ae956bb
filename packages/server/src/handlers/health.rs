/// Liveness probe.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    operation_id = "health",
    responses((status = 200, description = "Service is up", body = String)),
)]
pub async fn health() -> &'static str {
    "eseuri server is running"
}
