//! Serve mode: config, store, resolver, and the API server in one process.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hostgrid_core::HostgridConfig;
use hostgrid_registry::{CnameResolver, HickoryResolver, Registry, RegistrySettings};
use hostgrid_state::StateStore;
use tracing::info;

const DB_FILE: &str = "hostgrid.redb";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

/// Load config from `path` (plus environment) and apply CLI overrides.
pub fn resolve_config(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<HostgridConfig> {
    let mut config = HostgridConfig::load(path)?;
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if let Some(data_dir) = overrides.data_dir {
        config.server.data_dir = data_dir;
    }
    Ok(config)
}

/// Open the store under `data_dir` and wire it to `resolver`.
pub fn open_registry(
    config: &HostgridConfig,
    resolver: Arc<dyn CnameResolver>,
) -> anyhow::Result<Registry> {
    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join(DB_FILE);

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    Ok(Registry::new(
        Arc::new(store),
        resolver,
        RegistrySettings::from_config(config),
    ))
}

pub async fn run(config_path: Option<&Path>, overrides: Overrides) -> anyhow::Result<()> {
    info!("Hostgrid daemon starting");

    let config = resolve_config(config_path, overrides)?;
    info!(
        root_domain = %config.domain.root_domain,
        cname_target = %config.domain.cname_target,
        "configuration loaded"
    );

    let resolver = HickoryResolver::new(
        config.dns.upstream,
        Duration::from_secs(config.dns.timeout_secs),
    )?;
    info!(upstream = ?config.dns.upstream, "CNAME resolver initialized");

    let registry = open_registry(&config, Arc::new(resolver))?;

    let router = hostgrid_api::build_router(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("failed to install Ctrl-C handler");
                return std::future::pending().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Hostgrid daemon stopped");
    Ok(())
}
