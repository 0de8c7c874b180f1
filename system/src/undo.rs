use crate::history::{Action, ActionHistory};
use crate::types::ActionId;

#[derive(Debug, Clone, PartialEq)]
pub enum UndoTarget {
    /// A specific action still in history. Baked actions cannot be targeted.
    Action(ActionId),
    /// Whatever was appended last.
    Latest,
}

impl From<Option<ActionId>> for UndoTarget {
    fn from(id: Option<ActionId>) -> Self {
        id.map(UndoTarget::Action).unwrap_or(UndoTarget::Latest)
    }
}

/// Removes one action and, when something was removed, rebuilds the live
/// surface from the raster layer plus the remaining history. Replay is the
/// only way overlapping strokes come out right.
pub fn undo(history: &mut ActionHistory, target: &UndoTarget) -> Option<Action> {
    let removed = match target {
        UndoTarget::Action(id) => history.remove(id),
        UndoTarget::Latest => history.pop_latest(),
    };

    match &removed {
        Some(action) => {
            log::debug!("undo removed action {}", action.id);
            history.redraw();
        }
        None => log::debug!("undo {:?}: nothing to remove", target),
    }
    removed
}
