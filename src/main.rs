mod dom;
mod handlers;
mod listing;
mod showcase;
mod stats;
mod structures;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use log::info;
use reqwest::Client;

use crate::structures::{config::Config, errors::SiteError};

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path to config file
    #[arg(long, env, default_value = "./config.yaml")]
    config_path: String,

    /// address to listen on
    #[arg(long, env, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[actix_web::main]
async fn main() -> Result<(), SiteError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    info!("Started with args: {:?}", args);

    info!("Reading config from {}", args.config_path);
    let config = Config::from_path(&args.config_path)?;
    info!(
        "Serving {} from {} with {} showcase sites",
        config.site_name,
        config.site_root.display(),
        config.sites.len()
    );

    let config = web::Data::new(config);
    let client = Client::new();

    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(web::Data::new(client.clone()))
            .configure(handlers::configure)
    })
    .bind(args.bind.as_str())?
    .run()
    .await?)
}
