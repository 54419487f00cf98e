use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Pre-normalized pointer input consumed by the map.
///
/// Gesture recognition happens in the host; the map only sees deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Drag in progress, pixel delta since the previous drag event
    Drag { delta: Point },
    /// End of drag operation
    DragEnd,
    /// Scroll wheel; positive `delta` zooms in, in wheel notches
    Scroll { delta: f64, position: Point },
    /// Viewport/window resize
    Resize { size: Point },
}

impl InputEvent {
    /// Whether the event may move the viewport
    pub fn is_view_change(&self) -> bool {
        !matches!(self, InputEvent::Resize { .. })
    }
}

/// Whether the map consumed an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

impl EventHandled {
    pub fn is_handled(self) -> bool {
        self == EventHandled::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde() {
        let event = InputEvent::Scroll {
            delta: 1.0,
            position: Point::new(10.0, 20.0),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
        assert!(event.is_view_change());
        assert!(!InputEvent::Resize {
            size: Point::new(1.0, 1.0)
        }
        .is_view_change());
    }
}
