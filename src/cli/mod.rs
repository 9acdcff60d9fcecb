use clap::{ Args as ClapArgs, Parser, Subcommand };
use crate::config::provider::DEFAULT_SCRIPT_SRC;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON file holding the widget settings (apiUrl, targetPageSlug).
    #[arg(long, env = "LCW_SETTINGS_PATH", default_value = "lcw-settings.json", global = true)]
    pub settings_path: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve pages with the widget injected, plus the admin settings API.
    Serve(ServeArgs),
    /// Chat with the backend from the terminal through the widget controller.
    Chat(ChatArgs),
    /// Print the stored settings.
    Settings,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// API key required in the X-API-Key header to change settings. Open when unset.
    #[arg(long, env = "ADMIN_API_KEY")]
    pub admin_api_key: Option<String>,

    /// Secret used to sign anti-forgery nonces. Random per process when unset.
    #[arg(long, env = "NONCE_SECRET")]
    pub nonce_secret: Option<String>,

    /// URL of the widget script bundle referenced from injected pages.
    #[arg(long, env = "WIDGET_SCRIPT_SRC", default_value = DEFAULT_SCRIPT_SRC)]
    pub widget_script_src: String,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// TLS certificate file (PEM). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// TLS private key file (PEM). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Backend URL; overrides apiUrl from the settings file.
    #[arg(long, env = "LCW_API_URL")]
    pub api_url: Option<String>,

    /// Anti-forgery token sent with each question.
    #[arg(long, env = "LCW_NONCE", default_value = "")]
    pub nonce: String,

    /// Page slug checked against the visibility rule before the widget mounts.
    #[arg(long, default_value = "")]
    pub page: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_defaults() {
        let args = Args::try_parse_from(["lcw", "serve"]).unwrap();
        match args.command {
            Command::Serve(serve) => {
                assert_eq!(serve.server_addr, "127.0.0.1:4000");
                assert_eq!(serve.widget_script_src, DEFAULT_SCRIPT_SRC);
                assert!(!serve.enable_tls);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_chat_overrides() {
        let args = Args::try_parse_from([
            "lcw", "chat", "--api-url", "http://localhost:9000/ask", "--page", "faqs",
            "--settings-path", "/tmp/s.json",
        ]).unwrap();
        assert_eq!(args.settings_path, "/tmp/s.json");
        match args.command {
            Command::Chat(chat) => {
                assert_eq!(chat.api_url.as_deref(), Some("http://localhost:9000/ask"));
                assert_eq!(chat.page, "faqs");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
