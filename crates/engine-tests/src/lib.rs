#![allow(dead_code)]

use connectors::{
    destination::{Credentials, DestinationAdapter},
    sql::postgres::PgDestination,
};
use std::{env, sync::Arc};
use tokio_postgres::NoTls;

pub mod engine;
pub mod utils;

// Local Postgres used by the ignored end-to-end tests; override with TEST_PG_URL.
const DEFAULT_TEST_PG_URL: &str = "host=localhost user=user password=password dbname=testdb";

fn test_pg_url() -> String {
    env::var("TEST_PG_URL").unwrap_or_else(|_| DEFAULT_TEST_PG_URL.to_string())
}

fn pg_credentials() -> Credentials {
    Credentials::new(test_pg_url())
}

fn pg_destination() -> Arc<dyn DestinationAdapter> {
    Arc::new(PgDestination::new())
}

/// Runs a statement batch against the test database.
async fn pg_execute(sql: &str) {
    let (client, connection) = tokio_postgres::connect(&test_pg_url(), NoTls)
        .await
        .expect("connect postgres");
    tokio::spawn(connection);
    client.batch_execute(sql).await.expect("execute sql");
}

async fn pg_count(table: &str) -> i64 {
    let (client, connection) = tokio_postgres::connect(&test_pg_url(), NoTls)
        .await
        .expect("connect postgres");
    tokio::spawn(connection);
    client
        .query_one(format!("SELECT COUNT(*) FROM {table}").as_str(), &[])
        .await
        .expect("count rows")
        .get(0)
}
