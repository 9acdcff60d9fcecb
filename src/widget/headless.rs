use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::{ Arc, Mutex };
use super::dom::{ Control, LogEntry, MessageLog, NodeId, TextInput, WidgetElements };
use super::locked;

#[derive(Debug)]
pub struct HeadlessControl {
    visible: AtomicBool,
    enabled: AtomicBool,
}

impl HeadlessControl {
    pub fn new() -> Self {
        Self { visible: AtomicBool::new(true), enabled: AtomicBool::new(true) }
    }
}

impl Default for HeadlessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for HeadlessControl {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct HeadlessInput {
    control: HeadlessControl,
    value: Mutex<String>,
    focused: AtomicBool,
}

impl HeadlessInput {
    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }
}

impl Control for HeadlessInput {
    fn set_visible(&self, visible: bool) {
        self.control.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.control.is_visible()
    }

    fn set_enabled(&self, enabled: bool) {
        self.control.set_enabled(enabled);
        if !enabled {
            self.focused.store(false, Ordering::SeqCst);
        }
    }

    fn is_enabled(&self) -> bool {
        self.control.is_enabled()
    }
}

impl TextInput for HeadlessInput {
    fn value(&self) -> String {
        locked(&self.value).clone()
    }

    fn set_value(&self, value: &str) {
        *locked(&self.value) = value.to_string();
    }

    fn focus(&self) {
        if self.is_enabled() {
            self.focused.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Default)]
pub struct HeadlessLog {
    nodes: Mutex<Vec<(NodeId, LogEntry)>>,
    next_id: AtomicU64,
    at_bottom: AtomicBool,
}

impl HeadlessLog {
    pub fn entries(&self) -> Vec<(NodeId, LogEntry)> {
        locked(&self.nodes).clone()
    }

    /// Entries appended after `after`, or all of them.
    pub fn entries_after(&self, after: Option<NodeId>) -> Vec<(NodeId, LogEntry)> {
        locked(&self.nodes)
            .iter()
            .filter(|(id, _)| after.map_or(true, |a| *id > a))
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        locked(&self.nodes).iter().filter(|(_, e)| e.pending).count()
    }

    pub fn len(&self) -> usize {
        locked(&self.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.at_bottom.load(Ordering::SeqCst)
    }
}

impl MessageLog for HeadlessLog {
    fn append(&self, entry: LogEntry) -> NodeId {
        let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        locked(&self.nodes).push((id, entry));
        self.at_bottom.store(false, Ordering::SeqCst);
        id
    }

    fn remove(&self, id: NodeId) -> bool {
        let mut nodes = locked(&self.nodes);
        let before = nodes.len();
        nodes.retain(|(node, _)| *node != id);
        nodes.len() != before
    }

    fn scroll_to_bottom(&self) {
        self.at_bottom.store(true, Ordering::SeqCst);
    }
}

/// In-memory stand-in for the widget markup, used by the terminal front end
/// and by tests.
#[derive(Clone, Default)]
pub struct HeadlessDom {
    pub toggle: Arc<HeadlessControl>,
    pub close: Arc<HeadlessControl>,
    pub window: Arc<HeadlessControl>,
    pub log: Arc<HeadlessLog>,
    pub input: Arc<HeadlessInput>,
    pub send: Arc<HeadlessControl>,
}

impl HeadlessDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> WidgetElements {
        WidgetElements {
            toggle: self.toggle.clone(),
            close: self.close.clone(),
            window: self.window.clone(),
            log: self.log.clone(),
            input: self.input.clone(),
            send: self.send.clone(),
        }
    }
}
