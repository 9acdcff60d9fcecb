use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, BufReader };
use log::{ info, warn };
use crate::cli::ChatArgs;
use crate::config::WidgetSettings;
use crate::models::chat::Sender;
use crate::widget::dom::{ LogEntry, NodeContent, NodeId, TextInput };
use crate::widget::headless::HeadlessDom;
use crate::widget::{ AskClient, ChatWidget, HttpAskClient, WidgetConfig, WidgetState };

pub fn format_entry(entry: &LogEntry) -> String {
    let prefix = match (entry.sender, entry.pending) {
        (_, true) => "...",
        (Sender::User, _) => "you>",
        (Sender::Bot, _) => "bot>",
    };
    let body = match &entry.content {
        NodeContent::Text(text) | NodeContent::Markup(text) => text,
    };
    format!("{} {}", prefix, body)
}

fn print_new<W: Write>(dom: &HeadlessDom, after: Option<NodeId>, out: &mut W) -> std::io::Result<Option<NodeId>> {
    let mut last = after;
    for (id, entry) in dom.log.entries_after(after) {
        if !entry.pending {
            writeln!(out, "{}", format_entry(&entry))?;
        }
        last = Some(id);
    }
    out.flush()?;
    Ok(last)
}

/// Feeds lines from `input` to the widget until EOF or `/quit`.
pub async fn run_session<R, W>(
    widget: &ChatWidget,
    dom: &HeadlessDom,
    input: R,
    out: &mut W
) -> Result<(), Box<dyn Error + Send + Sync>>
    where R: AsyncBufRead + Unpin, W: Write
{
    let mut last = print_new(dom, None, out)?;
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/toggle" => {
                let state = widget.on_toggle_click();
                writeln!(out, "[widget {}]", if state == WidgetState::Open { "open" } else { "closed" })?;
            }
            _ if widget.state() == WidgetState::Closed => {
                writeln!(out, "[widget closed, type /toggle to open]")?;
            }
            _ => {
                dom.input.set_value(&line);
                widget.on_key_press("Enter").await;
            }
        }
        last = print_new(dom, last, out)?;
    }

    Ok(())
}

pub async fn run_chat(args: &ChatArgs, settings: WidgetSettings) -> Result<(), Box<dyn Error + Send + Sync>> {
    if !settings.visibility_rule().admits(&args.page) {
        warn!(
            "Widget is limited to page '{}', not shown on '{}'",
            settings.target_page_slug,
            args.page
        );
        return Ok(());
    }

    let config = WidgetConfig {
        endpoint_url: args.api_url.clone().unwrap_or(settings.api_url),
        csrf_token: args.nonce.clone(),
    };
    info!("Chatting with backend at {}", config.endpoint_url);

    let dom = HeadlessDom::new();
    let client: Arc<dyn AskClient> = Arc::new(HttpAskClient::new());
    let widget = ChatWidget::new(config, dom.elements(), client);
    widget.on_toggle_click();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(&widget, &dom, stdin, &mut stdout).await
}
