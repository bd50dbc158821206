//! Live-split mode.
//!
//! While active, repeated backspaces against `visible` keep feeding the same
//! `hidden` node instead of spawning a new one per keystroke.

use crate::types::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LiveSplit {
    #[default]
    Idle,
    Active { visible: NodeId, hidden: NodeId },
}

/// Inputs that move the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEvent {
    /// A live split created `hidden` under `visible`.
    Started { visible: NodeId, hidden: NodeId },
    /// Another character was moved into the active hidden node.
    Continued,
    /// Any other edit: insert, paste, replace, branch, destructive delete.
    Edited,
    /// The user picked a different node.
    SelectionChanged,
    /// The graph was swapped out by undo, redo or import.
    Restored,
}

impl LiveSplit {
    pub fn is_active(&self) -> bool {
        matches!(self, LiveSplit::Active { .. })
    }

    /// The hidden node fed by backspaces against `visible`, if active for it.
    pub fn hidden_for(&self, node: &str) -> Option<&NodeId> {
        match self {
            LiveSplit::Active { visible, hidden } if visible == node => Some(hidden),
            _ => None,
        }
    }

    pub fn next(self, event: ModeEvent) -> LiveSplit {
        match (self, event) {
            (_, ModeEvent::Started { visible, hidden }) => LiveSplit::Active { visible, hidden },
            (active @ LiveSplit::Active { .. }, ModeEvent::Continued) => active,
            (LiveSplit::Idle, ModeEvent::Continued) => LiveSplit::Idle,
            (_, ModeEvent::Edited | ModeEvent::SelectionChanged | ModeEvent::Restored) => {
                LiveSplit::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> LiveSplit {
        LiveSplit::Active {
            visible: "v".into(),
            hidden: "h".into(),
        }
    }

    #[test]
    fn test_transition_table() {
        let started = ModeEvent::Started {
            visible: "v".into(),
            hidden: "h".into(),
        };
        let cases = [
            (LiveSplit::Idle, started.clone(), active()),
            (active(), started, active()),
            (active(), ModeEvent::Continued, active()),
            (LiveSplit::Idle, ModeEvent::Continued, LiveSplit::Idle),
            (active(), ModeEvent::Edited, LiveSplit::Idle),
            (active(), ModeEvent::SelectionChanged, LiveSplit::Idle),
            (active(), ModeEvent::Restored, LiveSplit::Idle),
            (LiveSplit::Idle, ModeEvent::Edited, LiveSplit::Idle),
        ];
        for (from, event, expected) in cases {
            assert_eq!(from.clone().next(event.clone()), expected, "{from:?} + {event:?}");
        }
    }

    #[test]
    fn test_hidden_for() {
        assert_eq!(active().hidden_for("v").map(String::as_str), Some("h"));
        assert!(active().hidden_for("other").is_none());
        assert!(LiveSplit::Idle.hidden_for("v").is_none());
    }
}
