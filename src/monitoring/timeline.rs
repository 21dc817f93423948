//! Execution Timeline
//!
//! Records when plan actions start and finish so a run can be summarized
//! as per-action durations and an ASCII Gantt chart.
//!
//! The timeline is caller-owned state. Actions running in a concurrent
//! group share it as a [`SharedTimeline`] and take the lock themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Width of the Gantt chart bars area, in characters.
const CHART_WIDTH: f64 = 50.0;

/// A timeline shared between concurrently running actions.
pub type SharedTimeline = Arc<Mutex<Timeline>>;

/// What happened to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Started,
    Completed,
    Failed,
}

/// A single recorded event.
#[derive(Debug, Clone)]
pub struct Event {
    pub action_id: String,
    pub outcome: Outcome,
    pub at: Instant,
}

/// Start/finish bookkeeping for one run.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Vec<Event>,
    origin: Instant,
}

impl Timeline {
    /// Creates an empty timeline anchored at the current instant.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            origin: Instant::now(),
        }
    }

    /// Creates an empty timeline ready to be shared between threads.
    pub fn shared() -> SharedTimeline {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Records an event for `action_id` at the current instant.
    pub fn record(&mut self, action_id: impl Into<String>, outcome: Outcome) {
        self.events.push(Event {
            action_id: action_id.into(),
            outcome,
            at: Instant::now(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Time since the timeline was created.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Number of actions that finished with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.events.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Returns `(start, end)` offsets in milliseconds for every action that
    /// both started and finished, ordered by start.
    fn spans(&self) -> Vec<(String, u128, u128)> {
        let mut starts: HashMap<&str, u128> = HashMap::new();
        let mut spans = Vec::new();

        for event in &self.events {
            let offset = event.at.duration_since(self.origin).as_millis();
            match event.outcome {
                Outcome::Started => {
                    starts.insert(&event.action_id, offset);
                }
                Outcome::Completed | Outcome::Failed => {
                    if let Some(start) = starts.remove(event.action_id.as_str()) {
                        spans.push((event.action_id.clone(), start, offset));
                    }
                }
            }
        }

        spans.sort_by_key(|(_, start, _)| *start);
        spans
    }

    /// Duration in milliseconds of each finished action.
    pub fn durations(&self) -> HashMap<String, u128> {
        self.spans()
            .into_iter()
            .map(|(id, start, end)| (id, end - start))
            .collect()
    }

    /// Renders an ASCII Gantt chart of all finished actions.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total = self.elapsed().as_millis();
        if total == 0 {
            return output;
        }
        let scale = CHART_WIDTH / total as f64;

        for (id, start, end) in self.spans() {
            let offset = (start as f64 * scale) as usize;
            let width = ((end - start) as f64 * scale).max(1.0) as usize;

            output.push_str(&format!(
                "{:12} |{}{}| ({} ms)\n",
                truncate(&id, 12),
                " ".repeat(offset),
                "#".repeat(width),
                end - start
            ));
        }

        output.push_str(&format!(
            "\n{} completed, {} failed, total {} ms\n",
            self.count(Outcome::Completed),
            self.count(Outcome::Failed),
            total
        ));
        output
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Pads or shortens `s` to exactly `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_events() {
        let mut timeline = Timeline::new();
        timeline.record("1", Outcome::Started);
        timeline.record("1", Outcome::Completed);

        assert_eq!(timeline.events().len(), 2);
        assert_eq!(timeline.events()[1].outcome, Outcome::Completed);
    }

    #[test]
    fn test_durations() {
        let mut timeline = Timeline::new();
        timeline.record("1", Outcome::Started);
        thread::sleep(Duration::from_millis(30));
        timeline.record("1", Outcome::Completed);

        let durations = timeline.durations();
        assert!(*durations.get("1").unwrap() >= 30);
    }

    #[test]
    fn test_unfinished_action_has_no_duration() {
        let mut timeline = Timeline::new();
        timeline.record("2.1", Outcome::Started);

        assert!(timeline.durations().is_empty());
    }

    #[test]
    fn test_counts() {
        let mut timeline = Timeline::new();
        timeline.record("1", Outcome::Started);
        timeline.record("2", Outcome::Started);
        timeline.record("1", Outcome::Completed);
        timeline.record("2", Outcome::Failed);

        assert_eq!(timeline.count(Outcome::Started), 2);
        assert_eq!(timeline.count(Outcome::Completed), 1);
        assert_eq!(timeline.count(Outcome::Failed), 1);
    }

    #[test]
    fn test_gantt_chart() {
        let mut timeline = Timeline::new();
        timeline.record("fetch", Outcome::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.record("fetch", Outcome::Completed);
        timeline.record("store", Outcome::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.record("store", Outcome::Failed);

        let chart = timeline.gantt_chart();
        assert!(chart.contains("fetch"));
        assert!(chart.contains("store"));
        assert!(chart.contains("1 completed, 1 failed"));
    }

    #[test]
    fn test_shared_timeline_across_threads() {
        let timeline = Timeline::shared();
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let timeline = Arc::clone(&timeline);
                thread::spawn(move || {
                    let id = n.to_string();
                    timeline.lock().unwrap().record(id.clone(), Outcome::Started);
                    timeline.lock().unwrap().record(id, Outcome::Completed);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(timeline.lock().unwrap().durations().len(), 4);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc  ");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
