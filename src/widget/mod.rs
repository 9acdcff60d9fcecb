pub mod client;
pub mod dom;
pub mod headless;

use log::{ debug, error, info };
use serde::{ Deserialize, Serialize };
use std::sync::{ Arc, Mutex, MutexGuard };
use crate::models::chat::{ ChatMessage, Sender, Transcript };
use crate::models::wire::AskRequest;
use crate::render::render_markdown;
use self::dom::{ LogEntry, NodeContent, NodeId, WidgetElements };

pub use self::client::{ AskClient, HttpAskClient, WidgetError };

pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8000/ask";
pub const PENDING_TEXT: &str = "Thinking...";
pub const NO_ANSWER_TEXT: &str = "I'm sorry, I didn't get a response.";
pub const CONNECTION_ERROR_TEXT: &str = "Error connecting to server. Please try again later.";

/// Values the host hands the widget at page load. Never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub endpoint_url: String,
    pub csrf_token: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self { endpoint_url: DEFAULT_ENDPOINT_URL.to_string(), csrf_token: String::new() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetState {
    Closed,
    Open,
}

/// How a non-empty submit ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered,
    NoAnswer,
    Failed,
}

/// Locks `mutex`, carrying on with the data if a previous holder panicked.
pub(crate) fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ChatWidget {
    config: WidgetConfig,
    elements: WidgetElements,
    client: Arc<dyn AskClient>,
    state: Mutex<WidgetState>,
    transcript: Mutex<Transcript>,
}

impl ChatWidget {
    /// Mounts the widget closed and renders the greeting into the log.
    pub fn new(config: WidgetConfig, elements: WidgetElements, client: Arc<dyn AskClient>) -> Self {
        let widget = Self {
            config,
            elements,
            client,
            state: Mutex::new(WidgetState::Closed),
            transcript: Mutex::new(Transcript::new()),
        };
        widget.apply_state(WidgetState::Closed);
        for message in widget.transcript() {
            widget.draw(&message);
        }
        widget
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> WidgetState {
        *locked(&self.state)
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        locked(&self.transcript).messages().to_vec()
    }

    pub fn toggle(&self) -> WidgetState {
        let mut state = locked(&self.state);
        *state = match *state {
            WidgetState::Closed => WidgetState::Open,
            WidgetState::Open => WidgetState::Closed,
        };
        self.apply_state(*state);
        *state
    }

    pub fn on_toggle_click(&self) -> WidgetState {
        self.toggle()
    }

    pub fn on_close_click(&self) -> WidgetState {
        self.toggle()
    }

    pub async fn on_send_click(&self) -> Option<SubmitOutcome> {
        self.submit_input().await
    }

    pub async fn on_key_press(&self, key: &str) -> Option<SubmitOutcome> {
        if key == "Enter" {
            self.submit_input().await
        } else {
            None
        }
    }

    /// Submits whatever is currently typed in the input field.
    pub async fn submit_input(&self) -> Option<SubmitOutcome> {
        let text = self.elements.input.value();
        self.submit(&text).await
    }

    /// Runs one question/answer round trip. Returns `None` when `text` is blank.
    pub async fn submit(&self, text: &str) -> Option<SubmitOutcome> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank submission");
            return None;
        }

        self.render_message(ChatMessage::user(text));
        self.elements.input.set_value("");
        self.set_input_enabled(false);

        let pending = self.elements.log.append(LogEntry {
            sender: Sender::Bot,
            content: NodeContent::Text(PENDING_TEXT.to_string()),
            pending: true,
        });
        self.elements.log.scroll_to_bottom();

        let request = AskRequest { query: text.to_string() };
        let result = self.client.ask(&self.config, &request).await;
        self.elements.log.remove(pending);

        let outcome = match result {
            Ok(resp) =>
                match resp.answer {
                    Some(answer) => {
                        self.render_message(ChatMessage::bot(answer));
                        SubmitOutcome::Answered
                    }
                    None => {
                        info!("Backend response carried no answer");
                        self.render_message(ChatMessage::bot(NO_ANSWER_TEXT));
                        SubmitOutcome::NoAnswer
                    }
                }
            Err(e) => {
                error!("Failed to reach {}: {}", self.config.endpoint_url, e);
                self.render_message(ChatMessage::bot(CONNECTION_ERROR_TEXT));
                SubmitOutcome::Failed
            }
        };

        self.set_input_enabled(true);
        self.elements.input.focus();
        Some(outcome)
    }

    /// Appends `message` to the transcript and draws it at the end of the log.
    pub fn render_message(&self, message: ChatMessage) -> NodeId {
        let id = self.draw(&message);
        locked(&self.transcript).push(message);
        id
    }

    fn draw(&self, message: &ChatMessage) -> NodeId {
        let content = match message.sender {
            Sender::User => NodeContent::Text(message.text.clone()),
            Sender::Bot => NodeContent::Markup(render_markdown(Some(&message.text))),
        };
        let id = self.elements.log.append(LogEntry {
            sender: message.sender,
            content,
            pending: false,
        });
        self.elements.log.scroll_to_bottom();
        id
    }

    fn apply_state(&self, state: WidgetState) {
        let open = state == WidgetState::Open;
        self.elements.window.set_visible(open);
        self.elements.toggle.set_visible(!open);
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.elements.input.set_enabled(enabled);
        self.elements.send.set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::models::chat::GREETING;
    use crate::models::wire::AskResponse;
    use super::dom::{ Control, TextInput };
    use super::headless::HeadlessDom;
    use tokio::sync::Barrier;

    enum Reply {
        Answer(&'static str),
        Empty,
        Fail,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Observed {
        query: String,
        pending: usize,
        input_enabled: bool,
        send_enabled: bool,
        input_value: String,
    }

    struct FakeClient {
        dom: HeadlessDom,
        reply: Reply,
        barrier: Option<Barrier>,
        calls: Mutex<Vec<Observed>>,
    }

    impl FakeClient {
        fn new(dom: &HeadlessDom, reply: Reply) -> Arc<Self> {
            Arc::new(Self { dom: dom.clone(), reply, barrier: None, calls: Mutex::default() })
        }

        fn calls(&self) -> Vec<Observed> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AskClient for FakeClient {
        async fn ask(
            &self,
            _config: &WidgetConfig,
            request: &AskRequest
        ) -> Result<AskResponse, WidgetError> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            self.calls.lock().unwrap().push(Observed {
                query: request.query.clone(),
                pending: self.dom.log.pending_count(),
                input_enabled: self.dom.input.is_enabled(),
                send_enabled: self.dom.send.is_enabled(),
                input_value: self.dom.input.value(),
            });
            match self.reply {
                Reply::Answer(a) => Ok(AskResponse { answer: Some(a.to_string()) }),
                Reply::Empty => Ok(AskResponse::default()),
                Reply::Fail => Err(WidgetError::EmptyBody),
            }
        }
    }

    fn mount(reply: Reply) -> (HeadlessDom, Arc<FakeClient>, ChatWidget) {
        let dom = HeadlessDom::new();
        let client = FakeClient::new(&dom, reply);
        let widget = ChatWidget::new(WidgetConfig::default(), dom.elements(), client.clone());
        (dom, client, widget)
    }

    fn last_content(dom: &HeadlessDom) -> NodeContent {
        dom.log.entries().last().unwrap().1.content.clone()
    }

    #[test]
    fn starts_closed_with_greeting() {
        let (dom, _, widget) = mount(Reply::Empty);
        assert_eq!(widget.state(), WidgetState::Closed);
        assert!(dom.toggle.is_visible());
        assert!(!dom.window.is_visible());
        assert_eq!(widget.transcript(), vec![ChatMessage::bot(GREETING)]);
        assert_eq!(dom.log.len(), 1);
    }

    #[test]
    fn toggle_and_close_keep_visibility_complementary() {
        let (dom, _, widget) = mount(Reply::Empty);
        assert_eq!(widget.on_toggle_click(), WidgetState::Open);
        assert!(dom.window.is_visible() && !dom.toggle.is_visible());
        assert_eq!(widget.on_close_click(), WidgetState::Closed);
        assert!(!dom.window.is_visible() && dom.toggle.is_visible());
        for _ in 0..5 {
            widget.toggle();
            assert_ne!(dom.window.is_visible(), dom.toggle.is_visible());
        }
        assert_eq!(widget.state(), WidgetState::Open);
    }

    #[tokio::test]
    async fn submit_brackets_request_with_pending_and_disabled_input() {
        let (dom, client, widget) = mount(Reply::Answer("Hi there"));
        dom.input.set_value("  opening hours?  ");

        let outcome = widget.on_send_click().await;

        assert_eq!(outcome, Some(SubmitOutcome::Answered));
        assert_eq!(client.calls(), vec![Observed {
            query: "opening hours?".into(),
            pending: 1,
            input_enabled: false,
            send_enabled: false,
            input_value: String::new(),
        }]);
        assert_eq!(dom.log.pending_count(), 0);
        assert!(dom.input.is_enabled() && dom.send.is_enabled());
        assert!(dom.input.is_focused());
        assert_eq!(widget.transcript(), vec![
            ChatMessage::bot(GREETING),
            ChatMessage::user("opening hours?"),
            ChatMessage::bot("Hi there"),
        ]);
        assert_eq!(last_content(&dom), NodeContent::Markup(render_markdown(Some("Hi there"))));
        assert!(dom.log.is_scrolled_to_bottom());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let (dom, client, widget) = mount(Reply::Answer("x"));
        for text in ["", "   ", "\n\t"] {
            assert_eq!(widget.submit(text).await, None);
        }
        assert!(client.calls().is_empty());
        assert_eq!(widget.transcript().len(), 1);
        assert_eq!(dom.log.len(), 1);
    }

    #[tokio::test]
    async fn missing_answer_uses_fallback() {
        let (dom, _, widget) = mount(Reply::Empty);
        assert_eq!(widget.submit("hello").await, Some(SubmitOutcome::NoAnswer));
        assert_eq!(widget.transcript().last(), Some(&ChatMessage::bot(NO_ANSWER_TEXT)));
        assert_eq!(last_content(&dom), NodeContent::Markup(render_markdown(Some(NO_ANSWER_TEXT))));
        assert_eq!(dom.log.pending_count(), 0);
    }

    #[tokio::test]
    async fn failure_is_swallowed_and_input_restored() {
        let (dom, _, widget) = mount(Reply::Fail);
        assert_eq!(widget.submit("hello").await, Some(SubmitOutcome::Failed));
        assert_eq!(widget.transcript().last(), Some(&ChatMessage::bot(CONNECTION_ERROR_TEXT)));
        assert_eq!(dom.log.pending_count(), 0);
        assert!(dom.input.is_enabled() && dom.send.is_enabled() && dom.input.is_focused());

        // Still usable afterwards.
        assert_eq!(widget.submit("again").await, Some(SubmitOutcome::Failed));
        assert_eq!(widget.transcript().len(), 5);
    }

    #[tokio::test]
    async fn user_text_is_never_rendered_as_markup() {
        let (dom, _, widget) = mount(Reply::Answer("<b>**ok**</b>"));
        widget.submit("<img src=x> **hi**").await;
        let entries = dom.log.entries();
        let user = &entries[entries.len() - 2].1;
        assert_eq!(user.sender, Sender::User);
        assert_eq!(user.content, NodeContent::Text("<img src=x> **hi**".into()));
        assert_eq!(
            last_content(&dom),
            NodeContent::Markup("&lt;b&gt;<strong>ok</strong>&lt;/b&gt;".into())
        );
    }

    #[tokio::test]
    async fn only_enter_submits_from_keyboard() {
        let (dom, client, widget) = mount(Reply::Answer("x"));
        dom.input.set_value("question");
        assert_eq!(widget.on_key_press("a").await, None);
        assert!(client.calls().is_empty());
        assert_eq!(widget.on_key_press("Enter").await, Some(SubmitOutcome::Answered));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn toggling_while_request_outstanding_is_independent() {
        let dom = HeadlessDom::new();
        let client = Arc::new(FakeClient {
            dom: dom.clone(),
            reply: Reply::Answer("done"),
            barrier: Some(Barrier::new(2)),
            calls: Mutex::default(),
        });
        let widget = ChatWidget::new(WidgetConfig::default(), dom.elements(), client.clone());

        let toggled = async {
            tokio::task::yield_now().await;
            let state = widget.toggle();
            client.barrier.as_ref().unwrap().wait().await;
            state
        };
        let (outcome, state) = tokio::join!(widget.submit("q"), toggled);

        assert_eq!(state, WidgetState::Open);
        assert_eq!(outcome, Some(SubmitOutcome::Answered));
        assert!(dom.window.is_visible());
    }

    #[tokio::test]
    async fn concurrent_submits_each_remove_their_own_indicator() {
        let dom = HeadlessDom::new();
        let client = Arc::new(FakeClient {
            dom: dom.clone(),
            reply: Reply::Answer("a"),
            barrier: Some(Barrier::new(2)),
            calls: Mutex::default(),
        });
        let widget = ChatWidget::new(WidgetConfig::default(), dom.elements(), client.clone());

        let (first, second) = tokio::join!(widget.submit("one"), widget.submit("two"));

        assert_eq!(first, Some(SubmitOutcome::Answered));
        assert_eq!(second, Some(SubmitOutcome::Answered));
        // Both requests were dispatched before either was answered. Whichever
        // finishes first drops its own indicator and re-enables the input while
        // the other request is still outstanding: the lock is only in the UI.
        let mut calls = client.calls();
        calls.sort_by_key(|c| c.pending);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.iter().map(|c| c.pending).collect::<Vec<_>>(), vec![1, 2]);
        assert!(!calls[1].input_enabled && !calls[1].send_enabled);
        assert!(calls[0].input_enabled && calls[0].send_enabled);
        let mut queries: Vec<&str> = calls.iter().map(|c| c.query.as_str()).collect();
        queries.sort();
        assert_eq!(queries, vec!["one", "two"]);
        assert_eq!(dom.log.pending_count(), 0);
        assert_eq!(widget.transcript().len(), 5);
        assert!(dom.input.is_enabled());
    }
}
