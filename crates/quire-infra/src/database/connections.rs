use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DbConn, DbErr};

/// Connection pool settings for the blog database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub sql_logging: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            sql_logging: false,
        }
    }
}

/// Database connections used by the repositories.
pub struct DatabaseConnections {
    pub main: DbConn,
}

impl DatabaseConnections {
    /// Open the connection pool.
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DbErr> {
        tracing::info!("Initializing database connections...");

        let opts = ConnectOptions::new(&config.url)
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(config.sql_logging)
            .to_owned();

        let main = Database::connect(opts).await?;
        tracing::info!(pool = config.max_connections, "Main database connected");

        Ok(Self { main })
    }
}
