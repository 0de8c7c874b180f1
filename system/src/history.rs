use crate::message::Segment;
use crate::surface::{draw_segment, Surface};
use crate::types::ActionId;
use std::collections::VecDeque;

/// One continuous drag: segments in emission order, all sharing `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub segments: Vec<Segment>,
}

impl Action {
    fn new(id: ActionId) -> Self {
        Self {
            id,
            segments: Vec::new(),
        }
    }
}

/// Bounded undoable history over a permanent raster layer.
///
/// The live surface always equals `raster` with every segment of `actions`
/// replayed on top, in order. Actions pushed out of the window are baked into
/// `raster` and can no longer be undone.
pub struct ActionHistory {
    capacity: usize,
    actions: VecDeque<Action>,
    raster: Surface,
    live: Surface,
    baked: usize,
}

impl ActionHistory {
    pub fn new(capacity: usize, width: u32, height: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            actions: VecDeque::with_capacity(capacity),
            raster: Surface::new(width, height),
            live: Surface::new(width, height),
            baked: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> + '_ {
        self.actions.iter()
    }

    /// The action the next continuing segment would join.
    pub fn current(&self) -> Option<&Action> {
        self.actions.back()
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.actions.iter().any(|a| &a.id == id)
    }

    /// Number of actions baked since the last clear.
    pub fn baked_count(&self) -> usize {
        self.baked
    }

    pub fn live(&self) -> &Surface {
        &self.live
    }

    pub fn raster(&self) -> &Surface {
        &self.raster
    }

    pub fn append(&mut self, segment: Segment) {
        let continues = !segment.new_stroke
            && self
                .current()
                .map(|a| a.id == segment.action_id)
                .unwrap_or(false);

        if !continues {
            if self.actions.len() >= self.capacity {
                self.evict_oldest();
            }
            self.actions.push_back(Action::new(segment.action_id.clone()));
        }

        draw_segment(&mut self.live, &segment);
        if let Some(current) = self.actions.back_mut() {
            current.segments.push(segment);
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.actions.pop_front() {
            log::debug!(
                "baking action {} ({} segments)",
                oldest.id,
                oldest.segments.len()
            );
            for segment in &oldest.segments {
                draw_segment(&mut self.raster, segment);
            }
            self.baked += 1;
        }
    }

    /// Removes the most recently appended action with this id.
    pub(crate) fn remove(&mut self, id: &ActionId) -> Option<Action> {
        let pos = self.actions.iter().rposition(|a| &a.id == id)?;
        self.actions.remove(pos)
    }

    pub(crate) fn pop_latest(&mut self) -> Option<Action> {
        self.actions.pop_back()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.raster.clear();
        self.live.clear();
        self.baked = 0;
    }

    /// Rebuilds `surface` from scratch: raster layer, then every history
    /// segment in order.
    pub fn full_redraw(&self, surface: &mut Surface) {
        surface.clear();
        surface.blit(&self.raster);
        for action in &self.actions {
            for segment in &action.segments {
                draw_segment(surface, segment);
            }
        }
    }

    /// Rebuilds the live surface.
    pub fn redraw(&mut self) {
        let mut live = std::mem::replace(&mut self.live, Surface::new(0, 0));
        self.full_redraw(&mut live);
        self.live = live;
    }
}
