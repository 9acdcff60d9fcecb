use std::sync::Arc;
use crate::models::chat::Sender;

/// A page element the widget can show, hide, enable and disable.
pub trait Control: Send + Sync {
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

pub trait TextInput: Control {
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
    fn focus(&self);
}

/// Handle to one element appended to the message log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeContent {
    /// Inserted verbatim as text, never interpreted as markup.
    Text(String),
    /// Already-rendered markup.
    Markup(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub sender: Sender,
    pub content: NodeContent,
    pub pending: bool,
}

pub trait MessageLog: Send + Sync {
    fn append(&self, entry: LogEntry) -> NodeId;
    /// Returns false when the node was already gone.
    fn remove(&self, id: NodeId) -> bool;
    fn scroll_to_bottom(&self);
}

/// The element handles the widget is mounted on.
#[derive(Clone)]
pub struct WidgetElements {
    pub toggle: Arc<dyn Control>,
    pub close: Arc<dyn Control>,
    pub window: Arc<dyn Control>,
    pub log: Arc<dyn MessageLog>,
    pub input: Arc<dyn TextInput>,
    pub send: Arc<dyn Control>,
}
