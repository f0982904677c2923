use std::sync::Arc;

use hansom::config::Config;
use hansom::db::PgPool;
use hansom::engine::Engine;
use hansom::external::{notifier_from_env, LogChannel};
use hansom::server::serve;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().unwrap();

    let PgPool(pool) = PgPool::new(&config.database_url, config.max_connections)
        .await
        .unwrap();

    let engine = Engine::new(
        pool,
        config.clone(),
        notifier_from_env(),
        Arc::new(LogChannel),
    )
    .await
    .unwrap();

    serve(engine, config.bind_address).await;
}
