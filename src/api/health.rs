//! `GET /health`.

use axum::extract::Extension;
use axum::response::Json;
use serde::Serialize;

use super::ApiState;

/// Liveness report: provider count and whether the quota file is writable.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    providers_loaded: usize,
    quota_store_writable: bool,
}

pub async fn health_check(Extension(state): Extension<ApiState>) -> Json<HealthResponse> {
    let providers_loaded = state.router.providers().len();
    let quota_store_writable = quota_path_is_writable(&state.quota_path);

    Json(HealthResponse {
        status: "ok",
        providers_loaded,
        quota_store_writable,
    })
}

fn quota_path_is_writable(path: &std::path::Path) -> bool {
    match path.parent() {
        Some(dir) => dir
            .metadata()
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_tempdir_parent_reports_true() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage_counters.json");
        assert!(quota_path_is_writable(&path));
    }

    #[test]
    fn missing_parent_reports_false() {
        let path = std::path::PathBuf::from("/this/does/not/exist/usage_counters.json");
        assert!(!quota_path_is_writable(&path));
    }
}
