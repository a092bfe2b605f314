//! Check the configured RDS connection and target table
//!
//! Run with: cargo run --bin check_rds

use anyhow::{Context, Result};
use s3_rds_glue_ingest::db::{close_quietly, connect, split_table_name};
use s3_rds_glue_ingest::IngestConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = IngestConfig::from_env().context("invalid configuration")?;
    let db = &config.database;

    println!("🔌 Connecting to {}:{}/{} as {}", db.host, db.port, db.database, db.user);

    let mut conn = match connect(db).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Connection failed: {}", e);
            eprintln!("\n💡 Troubleshooting:");
            eprintln!("   1. Is the instance reachable from here (security group, VPC)?");
            eprintln!("   2. Does database '{}' exist?", db.database);
            eprintln!("   3. Are RDS_USER and RDS_PASSWORD correct?");
            eprintln!("   4. Is port {} open?", db.port);
            return Err(anyhow::Error::new(e).context("connection failed"));
        }
    };
    println!("✅ Connected successfully!");

    let (schema, table) = match split_table_name(&db.table) {
        (Some(schema), table) => (schema.to_string(), table.to_string()),
        (None, table) => ("public".to_string(), table.to_string()),
    };
    let exists = sqlx::query_as::<_, (bool,)>(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables
         WHERE table_schema = $1 AND table_name = $2)",
    )
    .bind(&schema)
    .bind(&table)
    .fetch_one(&mut conn)
    .await;

    close_quietly(conn).await;

    match exists.context("table lookup failed")? {
        (true,) => println!("   📋 Table {}.{} exists", schema, table),
        (false,) => println!("   ⚠️  Table {}.{} not found (it will be created on first load)", schema, table),
    }

    Ok(())
}
