use serde::{ Deserialize, Serialize };
use std::sync::Arc;
use log::debug;
use crate::models::chat::GREETING;
use crate::render::escape_attr;
use crate::widget::WidgetConfig;
use super::nonce::{ NonceIssuer, WIDGET_NONCE_ACTION };
use super::settings::WidgetSettings;

pub const STYLE_PATH: &str = "/assets/lcw-style.css";
pub const DEFAULT_SCRIPT_SRC: &str = "/assets/lcw-widget.js";
pub const STYLESHEET: &str = include_str!("../../assets/lcw-style.css");
/// Browser build of the widget controller, served at `DEFAULT_SCRIPT_SRC`.
pub const WIDGET_SCRIPT: &str = include_str!("../../assets/lcw-widget.js");

/// Configuration handed to the page, exposed to scripts as `lcwSettings`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedSettings {
    pub api_url: String,
    pub nonce: String,
}

impl From<LocalizedSettings> for WidgetConfig {
    fn from(settings: LocalizedSettings) -> Self {
        WidgetConfig { endpoint_url: settings.api_url, csrf_token: settings.nonce }
    }
}

/// Everything that goes into the page head when the widget is enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetBundle {
    pub style_href: String,
    pub script_src: String,
    pub settings: LocalizedSettings,
}

impl AssetBundle {
    pub fn to_html(&self) -> Result<String, serde_json::Error> {
        // "</" inside a script element would end it early.
        let settings_json = serde_json::to_string(&self.settings)?.replace("</", "<\\/");
        Ok(
            format!(
                "<link rel=\"stylesheet\" id=\"lcw-style-css\" href=\"{}\" />\n\
                 <script id=\"lcw-script-js-extra\">var lcwSettings = {};</script>\n\
                 <script id=\"lcw-script-js\" src=\"{}\" defer></script>\n",
                escape_attr(&self.style_href),
                settings_json,
                escape_attr(&self.script_src)
            )
        )
    }
}

/// Decides, per page, whether the widget is injected and with what settings.
pub struct ConfigurationProvider {
    settings: WidgetSettings,
    nonces: Arc<NonceIssuer>,
    script_src: String,
}

impl ConfigurationProvider {
    pub fn new(settings: WidgetSettings, nonces: Arc<NonceIssuer>, script_src: impl Into<String>) -> Self {
        Self { settings, nonces, script_src: script_src.into() }
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    fn shows_on(&self, page_slug: &str) -> bool {
        self.settings.visibility_rule().admits(page_slug)
    }

    /// Stylesheet, script and localized settings for `page_slug`, or `None`
    /// when the widget is scoped to another page.
    pub fn enqueue_assets(&self, page_slug: &str, session: &str) -> Option<AssetBundle> {
        if !self.shows_on(page_slug) {
            debug!("Skipping widget assets on page '{}'", page_slug);
            return None;
        }
        Some(AssetBundle {
            style_href: STYLE_PATH.to_string(),
            script_src: self.script_src.clone(),
            settings: LocalizedSettings {
                api_url: self.settings.api_url.clone(),
                nonce: self.nonces.create(WIDGET_NONCE_ACTION, session),
            },
        })
    }

    /// Widget markup for the page footer. Gated independently of the assets.
    pub fn widget_markup(&self, page_slug: &str) -> Option<String> {
        if !self.shows_on(page_slug) {
            debug!("Skipping widget markup on page '{}'", page_slug);
            return None;
        }
        Some(widget_markup_html())
    }

    pub fn render_page(&self, page_slug: &str, session: &str) -> Result<String, serde_json::Error> {
        let head = match self.enqueue_assets(page_slug, session) {
            Some(bundle) => bundle.to_html()?,
            None => String::new(),
        };
        let footer = self.widget_markup(page_slug).unwrap_or_default();
        let title = if page_slug.is_empty() { "Home" } else { page_slug };
        Ok(
            format!(
                "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<title>{title}</title>\n{head}</head>\n<body>\n<main><h1>{title}</h1></main>\n{footer}</body>\n</html>\n",
                title = escape_attr(title),
                head = head,
                footer = footer
            )
        )
    }
}

fn widget_markup_html() -> String {
    format!(
        r#"<div id="lcw-container">
    <button id="lcw-toggle-btn">
        <span class="dashicons dashicons-format-chat"></span> Chat with Library AI
    </button>
    <div id="lcw-chat-window" style="display: none;">
        <div class="lcw-header">
            <h3>Library Assistant</h3>
            <button id="lcw-close-btn">&times;</button>
        </div>
        <div id="lcw-messages">
            <div class="lcw-message bot">{}</div>
        </div>
        <div class="lcw-input-area">
            <input type="text" id="lcw-input" placeholder="Type a question..." />
            <button id="lcw-send-btn">Send</button>
        </div>
    </div>
</div>
"#,
        escape_attr(GREETING)
    )
}
