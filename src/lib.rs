pub mod cli;
pub mod config;
pub mod models;
pub mod render;
pub mod server;
pub mod terminal;
pub mod widget;

use cli::{ Args, Command };
use config::SettingsStore;
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let settings = SettingsStore::open(&args.settings_path)?;
    let current = settings.get().await;

    info!("--- Core Configuration ---");
    info!("Settings Path: {}", args.settings_path);
    info!("Backend API URL: {}", current.api_url);
    if current.target_page_slug.is_empty() {
        info!("Target Page: (all pages)");
    } else {
        info!("Target Page: {}", current.target_page_slug);
    }
    info!("-------------------------");

    match args.command {
        Command::Serve(serve_args) => {
            info!("Server Address: {}", serve_args.server_addr);
            info!("Widget Script: {}", serve_args.widget_script_src);
            info!("TLS Enabled: {}", serve_args.enable_tls);
            let server = Server::new(&serve_args, settings)?;
            server.run().await?;
        }
        Command::Chat(chat_args) => {
            terminal::run_chat(&chat_args, current).await?;
        }
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
    }

    Ok(())
}
