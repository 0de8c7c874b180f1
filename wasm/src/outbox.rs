use drawsync_system::{Frame, Transport};
use std::collections::VecDeque;

const BACKLOG_WARNING: usize = 256;

/// Frames the session wants on the socket, waiting for JS to pick them up.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: VecDeque<Frame>,
    close_requested: bool,
}

impl Outbox {
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn take_close_request(&mut self) -> bool {
        std::mem::replace(&mut self.close_requested, false)
    }

    fn push(&mut self, frame: Frame) {
        if self.frames.len() == BACKLOG_WARNING {
            log::warn!("pending frames must be consumed");
        }
        self.frames.push_back(frame);
    }
}

impl Transport for Outbox {
    fn subscribe(&mut self, destination: &str) {
        self.push(Frame::Subscribe {
            destination: destination.to_owned(),
        });
    }

    fn publish(&mut self, destination: &str, body: String) {
        self.push(Frame::Send {
            destination: destination.to_owned(),
            body,
        });
    }

    fn close(&mut self) {
        // frames queued before the close are stale now
        self.frames.clear();
        self.close_requested = true;
    }
}
