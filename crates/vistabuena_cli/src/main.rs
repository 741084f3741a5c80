//! CLI smoke probe.
//!
//! # Responsibility
//! - Open the configured store and report each collection's size.
//! - Exercise config, logging and repository wiring outside any UI.

use std::process::ExitCode;
use std::sync::Arc;
use vistabuena_core::{
    core_version, init_logging, ComplexService, CoreConfig, Entity, InventoryItem, KvStore,
    RepoError, RepoResult, Reservation, Resource, User, Version,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("vistabuena: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging(&config.logging)?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("cannot create `{}`: {err}", parent.display()))?;
    }
    let store: Arc<dyn KvStore> = Arc::new(config.open_store().map_err(|err| err.to_string())?);
    let service = ComplexService::new(Arc::clone(&store));

    println!("vistabuena_core version={}", core_version());
    println!("store path={}", config.db_path.display());

    report(
        User::NAMESPACE,
        service.users().await,
        service.user_repository().version().await,
    );
    report(
        Resource::NAMESPACE,
        service.resources().await,
        service.resource_repository().version().await,
    );
    report(
        InventoryItem::NAMESPACE,
        service.inventory().await,
        service.inventory_repository().version().await,
    );
    report(
        Reservation::NAMESPACE,
        service.reservations().await,
        service.reservation_repository().version().await,
    );

    let namespaces = store.namespaces().await.map_err(|err| err.to_string())?;
    println!("namespaces written={}", namespaces.len());
    Ok(())
}

fn report<T>(namespace: &str, records: RepoResult<Vec<T>>, version: RepoResult<Version>) {
    let version = version.map_or_else(|_| "?".to_string(), |version| version.to_string());
    match records {
        Ok(records) => println!("{namespace} records={} version={version}", records.len()),
        Err(err @ RepoError::StorageCorruption { .. }) => {
            log::warn!(
                "event=cli_report module=cli status=error namespace={namespace} error_code=storage_corruption"
            );
            println!("{namespace} warning: {err}");
        }
        Err(err) => println!("{namespace} error: {err}"),
    }
}
