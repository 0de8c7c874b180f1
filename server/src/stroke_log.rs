use crate::config::StrokeLimits;
use drawsync_system::{ActionId, Segment};
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug)]
struct LoggedAction {
    id: ActionId,
    created_at: Instant,
    segments: Vec<Segment>,
}

/// Everything drawn this round, replayed to late joiners. Bounded by action
/// count, total segments and age; the oldest actions go first.
#[derive(Debug)]
pub struct StrokeLog {
    limits: StrokeLimits,
    actions: VecDeque<LoggedAction>,
    total_segments: usize,
}

impl StrokeLog {
    pub fn new(limits: StrokeLimits) -> Self {
        Self {
            limits,
            actions: VecDeque::new(),
            total_segments: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn total_segments(&self) -> usize {
        self.total_segments
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.actions.iter().any(|a| &a.id == id)
    }

    /// Same grouping as the client history: a segment continues the newest
    /// action only when it shares its id and doesn't start a stroke.
    pub fn append(&mut self, segment: Segment, now: Instant) {
        let continues = !segment.new_stroke
            && self
                .actions
                .back()
                .map(|a| a.id == segment.action_id)
                .unwrap_or(false);
        if !continues {
            self.actions.push_back(LoggedAction {
                id: segment.action_id.clone(),
                created_at: now,
                segments: Vec::new(),
            });
        }
        if let Some(action) = self.actions.back_mut() {
            action.segments.push(segment);
            self.total_segments += 1;
        }
        self.trim(now);
    }

    fn trim(&mut self, now: Instant) {
        while let Some(oldest) = self.actions.front() {
            let over_count = self.actions.len() > self.limits.max_actions;
            let over_segments = self.total_segments > self.limits.max_segments;
            let too_old = now.saturating_duration_since(oldest.created_at) > self.limits.max_age;
            if !over_count && !over_segments && !too_old {
                break;
            }
            if let Some(dropped) = self.actions.pop_front() {
                log::debug!(
                    "dropping logged action {} ({} segments)",
                    dropped.id,
                    dropped.segments.len()
                );
                self.total_segments = self.total_segments.saturating_sub(dropped.segments.len());
            }
        }
    }

    /// Removes the targeted action, or the newest one without a target.
    /// Returns the id of what was removed.
    pub fn remove(&mut self, target: Option<&ActionId>) -> Option<ActionId> {
        let removed = match target {
            Some(id) => {
                let pos = self.actions.iter().rposition(|a| &a.id == id)?;
                self.actions.remove(pos)?
            }
            None => self.actions.pop_back()?,
        };
        self.total_segments = self.total_segments.saturating_sub(removed.segments.len());
        Some(removed.id)
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.total_segments = 0;
    }

    /// Every segment in log order, as a snapshot replays them.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.actions.iter().flat_map(|a| a.segments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawsync_system::StrokeMode;
    use std::time::Duration;

    fn segment(id: &str, new_stroke: bool) -> Segment {
        Segment {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            color: "#000000".into(),
            width: 2.0,
            mode: StrokeMode::Pen,
            action_id: ActionId::from(id),
            new_stroke,
        }
    }

    fn limits(max_actions: usize, max_segments: usize, max_age_secs: u64) -> StrokeLimits {
        StrokeLimits {
            max_actions,
            max_segments,
            max_age: Duration::from_secs(max_age_secs),
        }
    }

    #[test]
    fn groups_segments_into_actions() {
        let now = Instant::now();
        let mut log = StrokeLog::new(StrokeLimits::default());
        log.append(segment("a", true), now);
        log.append(segment("a", false), now);
        log.append(segment("b", false), now);
        log.append(segment("b", true), now);

        assert_eq!(log.len(), 3);
        assert_eq!(log.total_segments(), 4);
        let ids: Vec<&str> = log.segments().map(|s| s.action_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn trims_by_count_and_segments() {
        let now = Instant::now();
        let mut log = StrokeLog::new(limits(2, 100, 600));
        for id in &["a", "b", "c"] {
            log.append(segment(id, true), now);
        }
        assert_eq!(log.len(), 2);
        assert!(!log.contains(&"a".into()));

        let mut log = StrokeLog::new(limits(100, 3, 600));
        log.append(segment("a", true), now);
        log.append(segment("a", false), now);
        log.append(segment("b", true), now);
        log.append(segment("b", false), now);
        assert_eq!(log.len(), 1);
        assert_eq!(log.total_segments(), 2);
    }

    #[test]
    fn trims_by_age() {
        let start = Instant::now();
        let mut log = StrokeLog::new(limits(100, 100, 10));
        log.append(segment("old", true), start);
        log.append(segment("new", true), start + Duration::from_secs(11));
        assert_eq!(log.len(), 1);
        assert!(log.contains(&"new".into()));
    }

    #[test]
    fn remove_targets_or_takes_latest() {
        let now = Instant::now();
        let mut log = StrokeLog::new(StrokeLimits::default());
        log.append(segment("a", true), now);
        log.append(segment("b", true), now);
        log.append(segment("c", true), now);

        assert_eq!(log.remove(Some(&"b".into())), Some("b".into()));
        assert_eq!(log.remove(Some(&"zzz".into())), None);
        assert_eq!(log.remove(None), Some("c".into()));
        assert_eq!(log.total_segments(), 1);

        log.clear();
        assert_eq!(log.remove(None), None);
    }
}
