pub mod api;

use crate::cli::ServeArgs;
use crate::config::{ NonceIssuer, SettingsStore };
use self::api::AppState;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{ info, warn };
use uuid::Uuid;

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    tls: Option<(String, String)>,
}

impl Server {
    pub fn new(args: &ServeArgs, settings: SettingsStore) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = args.server_addr.parse::<SocketAddr>()?;

        let admin_api_key = args.admin_api_key.clone().filter(|k| !k.trim().is_empty());
        if admin_api_key.is_some() {
            info!("Admin settings protected by API key.");
        } else {
            warn!("Admin settings configured WITHOUT API key. Anyone can change them.");
        }

        let secret = match args.nonce_secret.clone().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("NONCE_SECRET not set; generated a random one. Nonces will not survive a restart.");
                Uuid::new_v4().to_string()
            }
        };

        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
                _ => {
                    return Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into());
                }
            }
        } else {
            None
        };

        let state = AppState {
            settings: Arc::new(settings),
            nonces: Arc::new(NonceIssuer::new(secret)),
            admin_api_key,
            script_src: args.widget_script_src.clone(),
        };

        Ok(Self { addr, state, tls })
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(self.addr, self.state.clone(), self.tls.clone()).await
    }
}
