use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use catalog_cache::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let pool: Pool<Postgres> = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url())
        .await?;

    // already-applied migrations are skipped, so rerunning is harmless
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(())
}
