use crate::message::Segment;
use crate::types::{ActionId, StrokeMode};
use euclid::default::Point2D;

pub const MIN_WIDTH: f32 = 1.0;
pub const MAX_WIDTH: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub color: String,
    pub width: f32,
    pub mode: StrokeMode,
}

impl Default for Tool {
    fn default() -> Self {
        Self {
            color: "#000000".into(),
            width: 3.0,
            mode: StrokeMode::Pen,
        }
    }
}

#[derive(Debug)]
struct Drag {
    action_id: ActionId,
    prev: Point2D<f32>,
    new_stroke: bool,
}

/// Turns pointer input into segments. Holds only local drag and tool state;
/// permission and connectivity are decided by the caller.
#[derive(Debug, Default)]
pub struct StrokeEmitter {
    tool: Tool,
    drag: Option<Drag>,
}

impl StrokeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn set_color(&mut self, color: &str) {
        self.tool.color = color.to_owned();
    }

    pub fn set_width(&mut self, width: f32) {
        if width.is_finite() {
            self.tool.width = width.max(MIN_WIDTH).min(MAX_WIDTH);
        }
    }

    pub fn set_mode(&mut self, mode: StrokeMode) {
        self.tool.mode = mode;
    }

    pub fn toggle_eraser(&mut self) -> StrokeMode {
        self.tool.mode = match self.tool.mode {
            StrokeMode::Pen => StrokeMode::Eraser,
            StrokeMode::Eraser => StrokeMode::Pen,
        };
        self.tool.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn current_action(&self) -> Option<&ActionId> {
        self.drag.as_ref().map(|d| &d.action_id)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> &ActionId {
        let drag = self.drag.insert(Drag {
            action_id: ActionId::generate(),
            prev: Point2D::new(x, y),
            new_stroke: true,
        });
        &drag.action_id
    }

    /// The segment from the previous position, or `None` outside a drag.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<Segment> {
        let drag = self.drag.as_mut()?;
        let current = Point2D::new(x, y);
        let segment = Segment {
            x1: drag.prev.x,
            y1: drag.prev.y,
            x2: current.x,
            y2: current.y,
            color: self.tool.color.clone(),
            width: self.tool.width,
            mode: self.tool.mode,
            action_id: drag.action_id.clone(),
            new_stroke: drag.new_stroke,
        };
        drag.prev = current;
        drag.new_stroke = false;
        Some(segment)
    }

    /// Pointer up, leave or cancel. Nothing goes on the wire for this.
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_emits_connected_segments() {
        let mut emitter = StrokeEmitter::new();
        assert!(emitter.pointer_move(1.0, 1.0).is_none());

        let id = emitter.pointer_down(0.0, 0.0).clone();
        let first = emitter.pointer_move(5.0, 0.0).unwrap();
        let second = emitter.pointer_move(5.0, 5.0).unwrap();

        assert!(first.new_stroke);
        assert!(!second.new_stroke);
        assert_eq!((first.x1, first.y1, first.x2, first.y2), (0.0, 0.0, 5.0, 0.0));
        assert_eq!((second.x1, second.y1), (5.0, 0.0));
        assert_eq!(first.action_id, id);
        assert_eq!(second.action_id, id);

        emitter.pointer_up();
        assert!(emitter.pointer_move(9.0, 9.0).is_none());
    }

    #[test]
    fn each_drag_gets_a_fresh_id() {
        let mut emitter = StrokeEmitter::new();
        let a = emitter.pointer_down(0.0, 0.0).clone();
        emitter.pointer_up();
        let b = emitter.pointer_down(0.0, 0.0).clone();
        assert_ne!(a, b);
    }

    #[test]
    fn tool_settings_flow_into_segments() {
        let mut emitter = StrokeEmitter::new();
        emitter.set_color("#ff0000");
        emitter.set_width(50.0);
        assert_eq!(emitter.toggle_eraser(), StrokeMode::Eraser);

        emitter.pointer_down(0.0, 0.0);
        let segment = emitter.pointer_move(1.0, 1.0).unwrap();
        assert_eq!(segment.color, "#ff0000");
        assert_eq!(segment.width, MAX_WIDTH);
        assert_eq!(segment.mode, StrokeMode::Eraser);
    }
}
