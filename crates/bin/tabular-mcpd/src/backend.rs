use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tabular_core::store::SurrealTableStore;
use tracing::info;

use crate::config::TabularConfig;

/// Opens the configured `SurrealDB` endpoint and selects the namespace and
/// database that hold the mirrored tables.
///
/// The URI scheme picks the engine: `mem://` for an in-process store,
/// `surrealkv://path` for an embedded file store, `ws://` or `http://` for a
/// remote server.
pub async fn connect_store(config: &TabularConfig) -> Result<SurrealTableStore<Any>, surrealdb::Error> {
    let db = any::connect(config.db_uri.as_str()).await?;

    if let Some(credentials) = config.db_credentials.as_ref() {
        db.signin(Root {
            username: credentials.username.as_str(),
            password: credentials.password.as_str(),
        })
        .await?;
    }

    db.use_ns(&config.db_namespace)
        .use_db(&config.db_database)
        .await?;
    info!(
        "connected to {} ({}/{})",
        config.db_uri, config.db_namespace, config.db_database
    );

    Ok(SurrealTableStore::new(db))
}
