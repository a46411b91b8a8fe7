//! hostgrid-api — REST API for Hostgrid.
//!
//! Thin axum layer over [`Registry`]: each request runs one registry
//! operation and maps its result onto a status code. Caller identity comes
//! from the `x-hostgrid-principal` header set by the upstream auth proxy.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/sites` | Register a subdomain |
//! | GET | `/api/v1/sites` | List the caller's sites |
//! | GET | `/api/v1/sites/{name}` | Get one of the caller's sites |
//! | DELETE | `/api/v1/sites/{name}` | Delete a site and its domains |
//! | POST | `/api/v1/sites/{name}/publish` | Publish or unpublish |
//! | POST | `/api/v1/sites/{name}/domains` | Attach a custom domain |
//! | POST | `/api/v1/domains/{domain}/verify` | Verify a custom domain's CNAME |
//! | GET | `/api/v1/public/{name}` | Published site, or 404 |
//! | GET | `/api/v1/route?host=` | Resolve a request host to a tenant |
//! | GET | `/healthz` | Liveness |

pub mod auth;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use hostgrid_registry::Registry;

pub use auth::{Caller, PRINCIPAL_HEADER};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Registry,
}

/// Build the complete API router.
pub fn build_router(registry: Registry) -> Router {
    let api_state = ApiState { registry };

    let api_routes = Router::new()
        .route("/sites", get(handlers::list_sites).post(handlers::register_site))
        .route("/sites/{name}", get(handlers::get_site).delete(handlers::delete_site))
        .route("/sites/{name}/publish", post(handlers::set_published))
        .route("/sites/{name}/domains", post(handlers::attach_domain))
        .route("/domains/{domain}/verify", post(handlers::verify_domain))
        .route("/public/{name}", get(handlers::public_site))
        .route("/route", get(handlers::route_host))
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
