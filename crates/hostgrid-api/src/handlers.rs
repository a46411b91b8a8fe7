//! REST API handlers.
//!
//! Each handler runs one registry operation and returns JSON.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use hostgrid_registry::{NewSite, RegistryError};

use crate::ApiState;
use crate::auth::Caller;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            retryable: false,
        })
    }
}

pub(crate) fn error_response(
    msg: &str,
    kind: &'static str,
    status: StatusCode,
) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
            kind: Some(kind),
            retryable: false,
        }),
    )
}

fn registry_error(err: RegistryError) -> Response {
    let status = match &err {
        RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistryError::Conflict(_) => StatusCode::CONFLICT,
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::DnsUnresolved { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Store(e) => {
            error!(error = %e, "registry store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
            retryable: err.is_retryable(),
        }),
    )
        .into_response()
}

// ── Sites ──────────────────────────────────────────────────────

/// POST /api/v1/sites
pub async fn register_site(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Json(input): Json<NewSite>,
) -> impl IntoResponse {
    match state.registry.register_site(input, &principal).await {
        Ok(registration) => (StatusCode::CREATED, ApiResponse::ok(registration)).into_response(),
        Err(e) => registry_error(e),
    }
}

/// GET /api/v1/sites
pub async fn list_sites(
    State(state): State<ApiState>,
    Caller(principal): Caller,
) -> impl IntoResponse {
    match state.registry.list_sites(Some(&principal)) {
        Ok(sites) => ApiResponse::ok(sites).into_response(),
        Err(e) => registry_error(e),
    }
}

/// GET /api/v1/sites/:name
pub async fn get_site(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.site_for_owner(&name, &principal) {
        Ok(site) => ApiResponse::ok(site).into_response(),
        Err(e) => registry_error(e),
    }
}

/// DELETE /api/v1/sites/:name
pub async fn delete_site(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.delete_site(&name, &principal).await {
        Ok(deletion) => ApiResponse::ok(deletion).into_response(),
        Err(e) => registry_error(e),
    }
}

/// Publish toggle body.
#[derive(serde::Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

/// POST /api/v1/sites/:name/publish
pub async fn set_published(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Path(name): Path<String>,
    Json(req): Json<PublishRequest>,
) -> impl IntoResponse {
    match state.registry.set_published(&name, req.published, &principal).await {
        Ok(site) => ApiResponse::ok(site).into_response(),
        Err(e) => registry_error(e),
    }
}

// ── Custom domains ─────────────────────────────────────────────

/// Attach body.
#[derive(serde::Deserialize)]
pub struct AttachRequest {
    pub domain: String,
}

/// POST /api/v1/sites/:name/domains
pub async fn attach_domain(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Path(name): Path<String>,
    Json(req): Json<AttachRequest>,
) -> impl IntoResponse {
    match state.registry.attach_domain(&name, &req.domain, &principal).await {
        Ok(domain) => (StatusCode::CREATED, ApiResponse::ok(domain)).into_response(),
        Err(e) => registry_error(e),
    }
}

/// POST /api/v1/domains/:domain/verify
pub async fn verify_domain(
    State(state): State<ApiState>,
    Caller(principal): Caller,
    Path(domain): Path<String>,
) -> impl IntoResponse {
    match state.registry.verify_domain(&domain, &principal).await {
        Ok(domain) => ApiResponse::ok(domain).into_response(),
        Err(e) => registry_error(e),
    }
}

// ── Public ─────────────────────────────────────────────────────

/// GET /api/v1/public/:name
pub async fn public_site(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.public_site(&name) {
        Ok(Some(site)) => ApiResponse::ok(site).into_response(),
        Ok(None) => {
            error_response("site not found", "not_found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => registry_error(e),
    }
}

/// Route lookup query.
#[derive(serde::Deserialize)]
pub struct RouteQuery {
    pub host: String,
}

/// GET /api/v1/route?host=
pub async fn route_host(
    State(state): State<ApiState>,
    Query(query): Query<RouteQuery>,
) -> impl IntoResponse {
    match state.registry.route_host(&query.host) {
        Ok(Some(routed)) => ApiResponse::ok(routed).into_response(),
        Ok(None) => {
            error_response("site not found", "not_found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => registry_error(e),
    }
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hostgrid_registry::{Principal, Registry, RegistrySettings, StaticResolver, Template};
    use hostgrid_state::StateStore;

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        let settings = RegistrySettings {
            root_domain: "hostgrid.dev".to_string(),
            cname_target: "cname.hostgrid.dev".to_string(),
            protocol: "https".to_string(),
        };
        let registry = Registry::new(Arc::new(store), Arc::new(StaticResolver::new()), settings);
        ApiState { registry }
    }

    fn caller(id: &str) -> Caller {
        Caller(Principal::new(id))
    }

    fn new_site(name: &str) -> NewSite {
        NewSite {
            subdomain: name.to_string(),
            icon: "🚀".to_string(),
            title: "Acme".to_string(),
            bio: "Rockets".to_string(),
            template: Template::Minimal,
            is_published: false,
            custom_domain: None,
        }
    }

    #[tokio::test]
    async fn register_returns_created() {
        let state = test_state();
        let resp = register_site(State(state), caller("alice"), Json(new_site("acme"))).await;
        assert_eq!(resp.into_response().status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn duplicate_register_is_conflict() {
        let state = test_state();
        let _ = register_site(State(state.clone()), caller("alice"), Json(new_site("acme"))).await;
        let resp = register_site(State(state), caller("bob"), Json(new_site("acme"))).await;
        assert_eq!(resp.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_register_is_bad_request() {
        let state = test_state();
        let resp = register_site(State(state), caller("alice"), Json(new_site("Bad Name"))).await;
        assert_eq!(resp.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_sites_empty() {
        let state = test_state();
        let resp = list_sites(State(state), caller("alice")).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_foreign_site_is_not_found() {
        let state = test_state();
        let _ = register_site(State(state.clone()), caller("alice"), Json(new_site("acme"))).await;

        let resp = delete_site(State(state), caller("bob"), Path("acme".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unpublished_site_is_not_public() {
        let state = test_state();
        let _ = register_site(State(state.clone()), caller("alice"), Json(new_site("acme"))).await;

        let resp = public_site(State(state.clone()), Path("acme".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);

        let _ = set_published(
            State(state.clone()),
            caller("alice"),
            Path("acme".to_string()),
            Json(PublishRequest { published: true }),
        )
        .await;

        let resp = public_site(State(state), Path("acme".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_unresolved_is_unprocessable() {
        let state = test_state();
        let _ = register_site(State(state.clone()), caller("alice"), Json(new_site("acme"))).await;
        let _ = attach_domain(
            State(state.clone()),
            caller("alice"),
            Path("acme".to_string()),
            Json(AttachRequest {
                domain: "acme.com".to_string(),
            }),
        )
        .await;

        let resp = verify_domain(State(state), caller("alice"), Path("acme.com".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn healthz_ok() {
        let resp = healthz().await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }
}
