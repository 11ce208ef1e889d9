// Document model
//
// Named mount slots holding the subtrees parsed from fragment markup, plus
// the single shared tooltip. Mounting replaces a slot's subtree wholesale:
// the previous elements (and every listener bound to them) are dropped with
// it, so rebinding never has to unbind anything.

pub mod hover;
pub mod markup;

pub use hover::{HoverController, Placement, PointerEvent, PointerListener};
pub use markup::parse_markup;

use crate::net::FragmentKind;
use std::collections::BTreeMap;

/// Class marking elements that get hover-tooltip behavior
pub const HOVER_MARKER_CLASS: &str = "hover-element";

/// Class added while the pointer is over an interactive element
pub const HIGHLIGHT_CLASS: &str = "hover-highlight";

/// Attribute holding an element's tooltip content
pub const TOOLTIP_ATTR: &str = "data-tooltip";

/// A parsed element; children are not linked, only document order is kept
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Direct text content
    pub text: String,
    listeners: Vec<PointerListener>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attrs.iter_mut().find(|(k, _)| k == "class") {
            Some((_, v)) if v.trim().is_empty() => *v = class.to_string(),
            Some((_, v)) => {
                v.push(' ');
                v.push_str(class);
            }
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        if let Some((_, v)) = self.attrs.iter_mut().find(|(k, _)| k == "class") {
            *v = v
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.has_class(HOVER_MARKER_CLASS)
    }

    pub fn is_highlighted(&self) -> bool {
        self.has_class(HIGHLIGHT_CLASS)
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.attr(TOOLTIP_ATTR)
    }

    /// Tooltip content split on `<br>` line breaks
    pub fn tooltip_lines(&self) -> Vec<&str> {
        let Some(tooltip) = self.tooltip() else {
            return Vec::new();
        };
        split_line_breaks(tooltip)
    }

    /// Day start of a timeline column's `changegraph(<ts>)` click handler
    pub fn jump_target(&self) -> Option<i64> {
        let handler = self.attr("onclick")?;
        let args = handler.trim().strip_prefix("changegraph(")?;
        let close = args.find(')')?;
        args[..close].trim().parse().ok()
    }

    pub fn listeners(&self) -> &[PointerListener] {
        &self.listeners
    }

    /// Register `listener` unless an identical one is already present
    fn add_listener(&mut self, listener: PointerListener) -> bool {
        if self.listeners.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }
}

fn split_line_breaks(s: &str) -> Vec<&str> {
    // ASCII lowering keeps byte offsets aligned with `s`
    let lower = s.to_ascii_lowercase();
    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut search = 0;
    while let Some(found) = lower[search..].find("<br") {
        let at = search + found;
        let after = &lower[at + 3..];
        match after.find('>') {
            Some(close) if after[..close].chars().all(|c| c.is_whitespace() || c == '/') => {
                lines.push(&s[line_start..at]);
                line_start = at + 3 + close + 1;
                search = line_start;
            }
            _ => search = at + 3,
        }
    }
    lines.push(&s[line_start..]);
    lines
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Elements parsed from one fragment response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subtree {
    pub elements: Vec<Element>,
    /// Visible text items in document order
    pub text_items: Vec<String>,
}

impl Subtree {
    /// Interactive elements (carrying the hover marker) in document order
    pub fn interactive(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_interactive())
    }

    /// Element index of the `nth` interactive element
    #[cfg(test)]
    pub fn interactive_index(&self, nth: usize) -> Option<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_interactive())
            .nth(nth)
            .map(|(idx, _)| idx)
    }

    pub fn element(&self, idx: usize) -> Option<&Element> {
        self.elements.get(idx)
    }

    pub fn element_mut(&mut self, idx: usize) -> Option<&mut Element> {
        self.elements.get_mut(idx)
    }

    pub fn has_hover_markers(&self) -> bool {
        self.interactive().next().is_some()
    }
}

/// Mount point for one fragment kind
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slot {
    pub mount_point: &'static str,
    pub content: Option<Subtree>,
    pub last_markup: Option<String>,
    /// Error placeholder shown while the last fetch failed
    pub error: Option<String>,
    /// Non-fatal remark about the mounted content
    pub notice: Option<String>,
    /// Refresh sequence number of the mounted content
    pub mounted_seq: u64,
}

/// Shared tooltip element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tooltip {
    pub visible: bool,
    pub content: String,
    pub placement: Option<Placement>,
    /// Slot of the element that showed it
    pub owner: Option<FragmentKind>,
    /// Times the tooltip has been shown (one per pointer-enter)
    pub shown: u64,
}

impl Tooltip {
    pub fn hide(&mut self) {
        self.visible = false;
        self.owner = None;
    }

    pub fn lines(&self) -> Vec<&str> {
        split_line_breaks(&self.content)
    }
}

/// Named slots plus the shared tooltip
#[derive(Debug, Clone)]
pub struct Document {
    slots: BTreeMap<FragmentKind, Slot>,
    pub tooltip: Tooltip,
}

impl Document {
    pub fn new() -> Self {
        let slots = FragmentKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    Slot {
                        mount_point: kind.mount_point(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            slots,
            tooltip: Tooltip::default(),
        }
    }

    pub fn slot(&self, kind: FragmentKind) -> &Slot {
        // Every kind is inserted in new()
        &self.slots[&kind]
    }

    pub fn slot_mut(&mut self, kind: FragmentKind) -> &mut Slot {
        self.slots.entry(kind).or_insert_with(|| Slot {
            mount_point: kind.mount_point(),
            ..Default::default()
        })
    }

    /// Replace the slot's content with freshly parsed `markup`
    ///
    /// Returns a mutable handle to the new subtree for listener binding.
    pub fn mount(&mut self, kind: FragmentKind, markup: String, seq: u64) -> &mut Subtree {
        let subtree = parse_markup(&markup);
        let slot = self.slot_mut(kind);
        slot.last_markup = Some(markup);
        slot.error = None;
        slot.notice = None;
        slot.mounted_seq = seq;
        slot.content.insert(subtree)
    }

    /// Record a failed fetch; the last good content stays mounted
    pub fn fail(&mut self, kind: FragmentKind, message: String) {
        self.slot_mut(kind).error = Some(message);
    }

    pub fn interactive_count(&self, kind: FragmentKind) -> usize {
        self.slot(kind)
            .content
            .as_ref()
            .map_or(0, |c| c.interactive().count())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_add_remove() {
        let mut el = Element::new("rect");
        el.attrs.push(("class".into(), "hover-element".into()));
        el.add_class(HIGHLIGHT_CLASS);
        el.add_class(HIGHLIGHT_CLASS);
        assert_eq!(el.attr("class"), Some("hover-element hover-highlight"));
        el.remove_class(HIGHLIGHT_CLASS);
        assert_eq!(el.attr("class"), Some("hover-element"));
        assert!(el.is_interactive());
    }

    #[test]
    fn test_jump_target_parsing() {
        let mut el = Element::new("g");
        el.attrs
            .push(("onclick".into(), "changegraph(1704067200);".into()));
        assert_eq!(el.jump_target(), Some(1_704_067_200));
        el.attrs[0].1 = "alert(1)".into();
        assert_eq!(el.jump_target(), None);
    }

    #[test]
    fn test_split_line_breaks_variants() {
        assert_eq!(split_line_breaks("a<br>b<BR/>c<br />d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_line_breaks("plain"), vec!["plain"]);
        assert_eq!(split_line_breaks("<br>"), Vec::<&str>::new());
    }

    #[test]
    fn test_mount_replaces_content_and_clears_error() {
        let mut doc = Document::new();
        doc.fail(FragmentKind::Flow, "flow: backend responded 500".into());
        doc.mount(
            FragmentKind::Flow,
            "<rect class='hover-element' data-tooltip='a'/>".into(),
            1,
        );
        let slot = doc.slot(FragmentKind::Flow);
        assert!(slot.error.is_none());
        assert_eq!(slot.mounted_seq, 1);
        assert_eq!(doc.interactive_count(FragmentKind::Flow), 1);

        doc.mount(FragmentKind::Flow, "<div>empty</div>".into(), 2);
        assert_eq!(doc.interactive_count(FragmentKind::Flow), 0);
        assert_eq!(
            doc.slot(FragmentKind::Flow).last_markup.as_deref(),
            Some("<div>empty</div>")
        );
    }

    #[test]
    fn test_fail_keeps_last_good_content() {
        let mut doc = Document::new();
        doc.mount(FragmentKind::Stats, "<span>ok</span>".into(), 1);
        doc.fail(FragmentKind::Stats, "stats: offline".into());
        let slot = doc.slot(FragmentKind::Stats);
        assert_eq!(slot.content.as_ref().unwrap().text_items, vec!["ok"]);
        assert_eq!(slot.error.as_deref(), Some("stats: offline"));
    }
}
