//! Playback viewer for one analysed video.
//!
//! The viewer owns all per-video state and is driven by three kinds of input:
//! media time updates, media lifecycle events (`play`, `ended`), and clicks.
//! It never touches a UI; callers apply the returned [`ViewerEffect`]s.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::alerts::AlertFeed;
use crate::model::{AnalysisBundle, BundleError, Participant, VideoMetadata};
use crate::persons::PersonPanel;
use crate::timeline::SopTimeline;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEffect {
    /// Move the media to `seconds`; resume playback when `resume` is set.
    Seek { seconds: u32, resume: bool },
    /// Bring the given SOP step into view.
    ScrollTo(usize),
    AlertRevealed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerTab {
    #[default]
    Events,
    Characters,
}

pub struct Viewer {
    metadata: VideoMetadata,
    participants: Vec<Participant>,
    timeline: SopTimeline,
    alerts: AlertFeed,
    persons: PersonPanel,
    tab: ViewerTab,
    position: f64,
}

impl Viewer {
    pub fn open(bundle: AnalysisBundle) -> Result<Self, BundleError> {
        bundle.validate()?;
        info!(
            "opening video {} ({} steps, {} alerts, {} persons)",
            bundle.video_metadata.video_id,
            bundle.event_sequence.len(),
            bundle.events.len(),
            bundle.persons_data.len()
        );

        Ok(Self {
            metadata: bundle.video_metadata,
            participants: bundle.participants,
            timeline: SopTimeline::new(bundle.event_sequence),
            alerts: AlertFeed::new(bundle.events),
            persons: PersonPanel::new(bundle.persons_data),
            tab: ViewerTab::default(),
            position: 0.0,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn timeline(&self) -> &SopTimeline {
        &self.timeline
    }

    pub fn alerts(&self) -> &AlertFeed {
        &self.alerts
    }

    pub fn persons(&self) -> &PersonPanel {
        &self.persons
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn tab(&self) -> ViewerTab {
        self.tab
    }

    pub fn switch_tab(&mut self, tab: ViewerTab) {
        self.tab = tab;
    }

    pub fn time_update(&mut self, position: f64) -> Vec<ViewerEffect> {
        self.position = position;
        let mut effects: Vec<ViewerEffect> = self
            .timeline
            .time_update(position)
            .into_iter()
            .map(ViewerEffect::ScrollTo)
            .collect();

        for i in self.alerts.time_update(position) {
            effects.push(ViewerEffect::AlertRevealed(
                self.alerts.alerts()[i].event_id.clone(),
            ));
        }
        effects
    }

    /// Media `play` event. Restarting from the beginning clears all derived state.
    pub fn play(&mut self, position: f64) {
        self.position = position;
        let timeline_reset = self.timeline.play(position);
        let alerts_reset = self.alerts.play(position);
        if timeline_reset || alerts_reset {
            debug!("viewer reset on replay of {}", self.metadata.video_id);
        }
    }

    pub fn ended(&mut self) {
        self.timeline.ended();
        let summary = self.timeline.summary();
        info!(
            "video {} ended: {} active, {} missed",
            self.metadata.video_id, summary.active, summary.missed
        );
    }

    fn seek(seconds: Option<u32>) -> Option<ViewerEffect> {
        seconds.map(|seconds| ViewerEffect::Seek {
            seconds,
            resume: true,
        })
    }

    pub fn click_step(&self, index: usize) -> Option<ViewerEffect> {
        Self::seek(self.timeline.seek_target(index))
    }

    pub fn click_alert(&self, index: usize) -> Option<ViewerEffect> {
        Self::seek(self.alerts.seek_target(index))
    }

    pub fn toggle_person(&mut self, huid: &str) -> Option<bool> {
        self.persons.toggle(huid)
    }

    pub fn click_action(&self, huid: &str, index: usize) -> Option<ViewerEffect> {
        Self::seek(self.persons.seek_target(huid, index))
    }

    /// Closes the view; the analysis data is discarded with the viewer.
    pub fn close(self) {
        debug!("closing video {}", self.metadata.video_id);
    }

    /// Text projection of the current state.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} [{}] at {:.1}s",
            self.metadata.video_id, self.metadata.environment, self.position
        );

        let _ = writeln!(out, "SOP sequence:");
        for (i, step) in self.timeline.steps().iter().enumerate() {
            if let Some(view) = self.timeline.view(i) {
                let _ = writeln!(
                    out,
                    "  {:>2}. [{:<7}] {:<10} {:<18} {}",
                    step.expected_order,
                    view.state,
                    view.time_label,
                    view.confidence_label,
                    step.description
                );
            }
        }

        match self.tab {
            ViewerTab::Events => {
                let _ = writeln!(out, "Real-time alerts:");
                if self.alerts.placeholder_visible() {
                    let _ = writeln!(out, "  Real-time alerts will be displayed here");
                }
                for alert in self.alerts.revealed() {
                    let _ = writeln!(
                        out,
                        "  {} [{}] {} ({} person(s))",
                        alert.timestamp,
                        alert.alert_level,
                        alert.description,
                        alert.persons_involved.len()
                    );
                }
            }
            ViewerTab::Characters => {
                let _ = writeln!(out, "Characters:");
                for person in self.persons.persons() {
                    let marker = if self.persons.is_expanded(&person.huid) {
                        "-"
                    } else {
                        "+"
                    };
                    let _ = writeln!(out, "  {} {} ({})", marker, person.name, person.role);
                    if self.persons.is_expanded(&person.huid) {
                        for line in self.persons.action_lines(&person.huid) {
                            let _ = writeln!(out, "      {}", line);
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_bundle;
    use crate::timeline::StepState;

    fn viewer() -> Viewer {
        let bundle =
            sample_bundle("vid", "https://example.com/vid.mp4", "Billing Counter").unwrap();
        Viewer::open(bundle).unwrap()
    }

    #[test]
    fn time_updates_emit_scroll_and_alert_effects() {
        let mut viewer = viewer();
        viewer.play(0.0);
        assert_eq!(viewer.time_update(4.2), vec![ViewerEffect::ScrollTo(0)]);
        assert_eq!(
            viewer.time_update(9.0),
            vec![ViewerEffect::AlertRevealed("evt_001".to_string())]
        );
    }

    #[test]
    fn clicks_translate_to_seeks() {
        let mut viewer = viewer();
        assert_eq!(
            viewer.click_step(2),
            Some(ViewerEffect::Seek {
                seconds: 18,
                resume: true
            })
        );
        assert_eq!(viewer.click_alert(0), None);
        viewer.time_update(10.0);
        assert_eq!(
            viewer.click_alert(0),
            Some(ViewerEffect::Seek {
                seconds: 9,
                resume: true
            })
        );

        let huid = viewer.persons().persons()[0].huid.clone();
        assert_eq!(viewer.toggle_person(&huid), Some(true));
        assert_eq!(
            viewer.click_action(&huid, 0),
            Some(ViewerEffect::Seek {
                seconds: 4,
                resume: true
            })
        );
    }

    #[test]
    fn replay_from_start_resets_steps_and_alerts() {
        let mut viewer = viewer();
        viewer.time_update(50.0);
        viewer.ended();
        viewer.play(0.0);
        assert!(viewer
            .timeline()
            .states()
            .iter()
            .all(|s| *s == StepState::Waiting));
        assert!(viewer.alerts().placeholder_visible());
    }

    #[test]
    fn render_follows_the_selected_tab() {
        let mut viewer = viewer();
        viewer.time_update(20.0);
        let events = viewer.render();
        assert!(events.contains("Real-time alerts:"));
        assert!(events.contains("Person too close to the billing counter"));

        viewer.switch_tab(ViewerTab::Characters);
        let huid = viewer.persons().persons()[1].huid.clone();
        viewer.toggle_person(&huid);
        let characters = viewer.render();
        assert!(characters.contains("walks into the store"));
        assert!(!characters.contains("Real-time alerts:"));
    }

    #[test]
    fn invalid_bundles_are_rejected() {
        let mut bundle = sample_bundle("vid", "u", "Billing Counter").unwrap();
        bundle.event_sequence[1].expected_order = 1;
        assert!(Viewer::open(bundle).is_err());
    }
}
