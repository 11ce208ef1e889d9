// Hover-tooltip behavior
//
// Binds enter/leave/move listeners to every interactive element of a freshly
// mounted subtree and applies their effects to the shared tooltip when
// pointer events are dispatched.

use super::{Document, Subtree, HIGHLIGHT_CLASS};
use crate::net::FragmentKind;

/// Default tooltip offset from the pointer, in pixels
pub const TOOLTIP_OFFSET: i32 = 10;

/// Default distance from the right viewport edge at which the tooltip flips
/// to the pointer's left, in pixels
pub const TOOLTIP_EDGE_MARGIN: i32 = 100;

/// Listener kinds an interactive element can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerListener {
    Enter,
    Leave,
    Move,
}

impl PointerListener {
    pub const ALL: [PointerListener; 3] = [
        PointerListener::Enter,
        PointerListener::Leave,
        PointerListener::Move,
    ];
}

/// Pointer event delivered to one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
    /// Pointer position in page coordinates
    Move { x: i32, y: i32 },
}

impl PointerEvent {
    fn listener(self) -> PointerListener {
        match self {
            PointerEvent::Enter => PointerListener::Enter,
            PointerEvent::Leave => PointerListener::Leave,
            PointerEvent::Move { .. } => PointerListener::Move,
        }
    }
}

/// Which side of the pointer the tooltip sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `x` is the tooltip's left edge
    Right,
    /// `x` is the tooltip's right edge
    Left,
}

/// Tooltip anchor computed from the last pointer move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub side: Side,
}

/// Offsets used when positioning the tooltip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverConfig {
    pub offset: i32,
    pub edge_margin: i32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            offset: TOOLTIP_OFFSET,
            edge_margin: TOOLTIP_EDGE_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoverController {
    config: HoverConfig,
}

impl HoverController {
    /// Attach hover listeners to every interactive element in `root`
    ///
    /// Elements that already carry a listener are left alone, so binding the
    /// same subtree again adds nothing. Returns the number of listeners added.
    pub fn bind(&self, root: &mut Subtree) -> usize {
        let mut added = 0;
        for element in root.elements.iter_mut().filter(|e| e.is_interactive()) {
            for listener in PointerListener::ALL {
                if element.add_listener(listener) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Tooltip anchor for a pointer at (`x`, `y`) in a viewport `viewport_width` wide
    pub fn place(&self, x: i32, y: i32, viewport_width: i32) -> Placement {
        let y = y + self.config.offset;
        if x >= viewport_width - self.config.edge_margin {
            Placement {
                x: x - self.config.offset,
                y,
                side: Side::Left,
            }
        } else {
            Placement {
                x: x + self.config.offset,
                y,
                side: Side::Right,
            }
        }
    }

    /// Deliver `event` to element `idx` of the `kind` slot
    ///
    /// Every matching listener on the element fires once. Returns the number
    /// of listeners fired; unbound or missing elements fire none.
    pub fn dispatch(
        &self,
        doc: &mut Document,
        kind: FragmentKind,
        idx: usize,
        event: PointerEvent,
        viewport_width: i32,
    ) -> usize {
        let wanted = event.listener();
        let Some(element) = doc
            .slot_mut(kind)
            .content
            .as_mut()
            .and_then(|content| content.element_mut(idx))
        else {
            return 0;
        };
        let fired = element.listeners().iter().filter(|l| **l == wanted).count();
        if fired == 0 {
            return 0;
        }

        let mut shown_content = None;
        match event {
            PointerEvent::Enter => {
                element.add_class(HIGHLIGHT_CLASS);
                shown_content = Some(element.tooltip().unwrap_or_default().to_string());
            }
            PointerEvent::Leave => element.remove_class(HIGHLIGHT_CLASS),
            PointerEvent::Move { .. } => {}
        }

        let tooltip = &mut doc.tooltip;
        match event {
            PointerEvent::Enter => {
                tooltip.content = shown_content.unwrap_or_default();
                tooltip.visible = true;
                tooltip.owner = Some(kind);
                tooltip.shown += fired as u64;
            }
            PointerEvent::Leave => tooltip.hide(),
            PointerEvent::Move { x, y } => {
                tooltip.placement = Some(self.place(x, y, viewport_width));
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FLOW: &str = "<svg>\
        <rect class='hover-element' data-tooltip='work<br>1:00:00' />\
        <rect class='plain' />\
        <rect class='hover-element' data-tooltip='play' />\
        </svg>";

    fn mounted() -> (Document, HoverController) {
        let mut doc = Document::new();
        let hover = HoverController::default();
        let subtree = doc.mount(FragmentKind::Flow, FLOW.to_string(), 1);
        hover.bind(subtree);
        (doc, hover)
    }

    #[test]
    fn test_bind_only_touches_interactive_elements() {
        let (doc, _) = mounted();
        let content = doc.slot(FragmentKind::Flow).content.as_ref().unwrap();
        let bound: Vec<usize> = content.elements.iter().map(|e| e.listeners().len()).collect();
        // svg, rect, plain rect, rect
        assert_eq!(bound, vec![0, 3, 0, 3]);
    }

    #[test]
    fn test_bind_twice_does_not_double_fire() {
        let (mut doc, hover) = mounted();
        let content = doc.slot_mut(FragmentKind::Flow).content.as_mut().unwrap();
        assert_eq!(hover.bind(content), 0);

        let fired = hover.dispatch(&mut doc, FragmentKind::Flow, 1, PointerEvent::Enter, 1000);
        assert_eq!(fired, 1);
        assert_eq!(doc.tooltip.shown, 1);
        let fired = hover.dispatch(&mut doc, FragmentKind::Flow, 1, PointerEvent::Leave, 1000);
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_enter_move_leave_cycle() {
        let (mut doc, hover) = mounted();
        hover.dispatch(&mut doc, FragmentKind::Flow, 1, PointerEvent::Enter, 1000);
        assert!(doc.tooltip.visible);
        assert_eq!(doc.tooltip.lines(), vec!["work", "1:00:00"]);
        let highlighted = |doc: &Document| {
            doc.slot(FragmentKind::Flow).content.as_ref().unwrap().elements[1].is_highlighted()
        };
        assert!(highlighted(&doc));

        hover.dispatch(
            &mut doc,
            FragmentKind::Flow,
            1,
            PointerEvent::Move { x: 40, y: 50 },
            1000,
        );
        assert_eq!(
            doc.tooltip.placement,
            Some(Placement { x: 50, y: 60, side: Side::Right })
        );

        hover.dispatch(&mut doc, FragmentKind::Flow, 1, PointerEvent::Leave, 1000);
        assert!(!doc.tooltip.visible);
        assert!(!highlighted(&doc));
    }

    #[test]
    fn test_unbound_element_ignores_events() {
        let (mut doc, hover) = mounted();
        let fired = hover.dispatch(&mut doc, FragmentKind::Flow, 2, PointerEvent::Enter, 1000);
        assert_eq!(fired, 0);
        assert!(!doc.tooltip.visible);
        // Out of range and empty slots are no-ops too
        assert_eq!(
            hover.dispatch(&mut doc, FragmentKind::Flow, 99, PointerEvent::Enter, 1000),
            0
        );
        assert_eq!(
            hover.dispatch(&mut doc, FragmentKind::Band, 0, PointerEvent::Enter, 1000),
            0
        );
    }

    #[test]
    fn test_remount_drops_old_listeners() {
        let (mut doc, hover) = mounted();
        let subtree = doc.mount(FragmentKind::Flow, FLOW.to_string(), 2);
        assert_eq!(hover.bind(subtree), 6);
        let content = doc.slot(FragmentKind::Flow).content.as_ref().unwrap();
        assert!(content.elements.iter().all(|e| e.listeners().len() <= 3));
    }

    #[test]
    fn test_flip_near_right_edge() {
        let hover = HoverController::default();
        let p = hover.place(950, 10, 1000);
        assert_eq!(p, Placement { x: 940, y: 20, side: Side::Left });
        let p = hover.place(899, 10, 1000);
        assert_eq!(p.side, Side::Right);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Tooltip anchors left of the pointer exactly within the edge margin
        #[test]
        fn prop_tooltip_side_follows_edge_margin(
            width in 200i32..4000i32,
            frac in 0.0f64..1.0f64,
            y in 0i32..2000i32,
        ) {
            let hover = HoverController::default();
            let x = (width as f64 * frac) as i32;
            let p = hover.place(x, y, width);
            if width - x <= TOOLTIP_EDGE_MARGIN {
                prop_assert_eq!(p.side, Side::Left);
                prop_assert!(p.x < x);
            } else {
                prop_assert_eq!(p.side, Side::Right);
                prop_assert!(p.x > x);
            }
            prop_assert_eq!(p.y, y + TOOLTIP_OFFSET);
        }
    }
}
