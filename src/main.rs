use std::{net::TcpListener, sync::Arc};

use anyhow::Result;
use crabchat::{config::Config, poll::Poller, rest::RestServer, store::MessageStore};
use log::info;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let store = Arc::new(MessageStore::new(config.store.clone()));
    let poller = Poller::new(store, config.poll.clone());

    let listener = TcpListener::bind(config.bind)?;
    info!("Listening on {}", config.bind);

    RestServer::new(poller, listener)?.run().await?;

    info!("Server stopped");
    Ok(())
}
