//! Database connection management using sqlx

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, warn};

/// Connection options for the configured RDS instance.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .application_name("s3-rds-glue-ingest")
}

/// Open a single connection to the configured instance and check it answers.
pub async fn connect(config: &DatabaseConfig) -> Result<PgConnection, sqlx::Error> {
    connect_with(&connect_options(config)).await
}

/// Open a single connection from explicit options and check it answers.
pub async fn connect_with(options: &PgConnectOptions) -> Result<PgConnection, sqlx::Error> {
    debug!(
        host = %options.get_host(),
        port = options.get_port(),
        database = options.get_database().unwrap_or_default(),
        "connecting"
    );
    let mut conn = PgConnection::connect_with(options).await?;

    if let Err(e) = sqlx::query("SELECT 1").execute(&mut conn).await {
        close_quietly(conn).await;
        return Err(e);
    }

    Ok(conn)
}

/// Close a connection, logging rather than returning a failure.
pub async fn close_quietly(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close database connection cleanly");
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Split `schema.table` at the first dot. Anything after it, dots included,
/// is the table name.
pub fn split_table_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

/// Quote a possibly schema-qualified table name (`schema.table`).
pub fn qualified_table(name: &str) -> String {
    match split_table_name(name) {
        (Some(schema), table) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        (None, table) => quote_ident(table),
    }
}
