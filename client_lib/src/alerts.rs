//! Real-time alert feed: alerts appear once playback reaches them.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::model::AlertEvent;
use crate::timeline::RESTART_THRESHOLD_SECS;
use std::collections::HashSet;

pub struct AlertFeed {
    alerts: Vec<AlertEvent>,
    seconds: Vec<Option<u32>>,
    shown: HashSet<String>,
}

impl AlertFeed {
    pub fn new(alerts: Vec<AlertEvent>) -> Self {
        let seconds = alerts.iter().map(AlertEvent::seconds).collect();
        Self {
            alerts,
            seconds,
            shown: HashSet::new(),
        }
    }

    pub fn alerts(&self) -> &[AlertEvent] {
        &self.alerts
    }

    /// Reveals every alert whose timestamp has been reached.
    /// Returns the indices revealed by this update.
    pub fn time_update(&mut self, position: f64) -> Vec<usize> {
        let mut revealed = Vec::new();
        for (i, alert) in self.alerts.iter().enumerate() {
            let Some(ts) = self.seconds[i] else {
                continue;
            };
            if position >= f64::from(ts) && self.shown.insert(alert.event_id.clone()) {
                info!(
                    "alert {} ({}) revealed at {:.2}s",
                    alert.event_id, alert.alert_level, position
                );
                revealed.push(i);
            }
        }
        revealed
    }

    /// Handles the media `play` event. Returns true when it hid every alert again.
    pub fn play(&mut self, position: f64) -> bool {
        if position < RESTART_THRESHOLD_SECS {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.shown.clear();
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.alerts
            .get(index)
            .is_some_and(|a| self.shown.contains(&a.event_id))
    }

    pub fn revealed(&self) -> impl Iterator<Item = &AlertEvent> {
        self.alerts
            .iter()
            .filter(move |a| self.shown.contains(&a.event_id))
    }

    /// The "alerts will appear here" placeholder shows while nothing is revealed.
    pub fn placeholder_visible(&self) -> bool {
        self.shown.is_empty()
    }

    /// Only revealed alerts respond to clicks.
    pub fn seek_target(&self, index: usize) -> Option<u32> {
        if !self.is_revealed(index) {
            return None;
        }
        self.seconds[index]
    }

    pub fn involving<'a>(&'a self, huid: &'a str) -> impl Iterator<Item = &'a AlertEvent> + 'a {
        self.alerts
            .iter()
            .filter(move |a| a.persons_involved.contains(huid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertLevel;
    use std::collections::BTreeSet;

    fn alert(id: &str, ts: &str, persons: &[&str]) -> AlertEvent {
        AlertEvent {
            event_id: id.to_string(),
            description: format!("alert {}", id),
            timestamp: ts.to_string(),
            persons_involved: persons.iter().map(|p| p.to_string()).collect::<BTreeSet<_>>(),
            alert_level: AlertLevel::High,
        }
    }

    fn feed() -> AlertFeed {
        AlertFeed::new(vec![
            alert("evt_001", "00:00:09", &["emp"]),
            alert("evt_002", "00:00:30", &["emp", "cust"]),
            alert("evt_003", "bogus", &[]),
        ])
    }

    #[test]
    fn alerts_reveal_once_at_their_timestamp() {
        let mut feed = feed();
        assert!(feed.placeholder_visible());
        assert!(feed.time_update(5.0).is_empty());
        assert_eq!(feed.time_update(9.0), vec![0]);
        assert!(feed.time_update(12.0).is_empty());
        assert!(!feed.placeholder_visible());
        assert_eq!(feed.time_update(31.0), vec![1]);
    }

    #[test]
    fn seeking_back_keeps_alerts_visible() {
        let mut feed = feed();
        feed.time_update(10.0);
        feed.time_update(2.0);
        assert!(feed.is_revealed(0));
        assert!(!feed.play(2.0));
        assert!(feed.is_revealed(0));
    }

    #[test]
    fn restart_hides_everything() {
        let mut feed = feed();
        feed.time_update(60.0);
        assert!(feed.play(0.0));
        assert_eq!(feed.revealed().count(), 0);
        assert!(feed.placeholder_visible());
    }

    #[test]
    fn malformed_timestamp_never_reveals() {
        let mut feed = feed();
        feed.time_update(10_000.0);
        assert!(!feed.is_revealed(2));
        assert_eq!(feed.seek_target(2), None);
    }

    #[test]
    fn only_revealed_alerts_seek() {
        let mut feed = feed();
        assert_eq!(feed.seek_target(0), None);
        feed.time_update(9.0);
        assert_eq!(feed.seek_target(0), Some(9));
    }

    #[test]
    fn filters_by_person() {
        let feed = feed();
        let ids: Vec<&str> = feed.involving("cust").map(|a| a.event_id.as_str()).collect();
        assert_eq!(ids, ["evt_002"]);
        assert_eq!(feed.involving("emp").count(), 2);
    }
}
