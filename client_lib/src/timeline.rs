//! SOP step timeline driven by playback position.
//!
//! Every step is classified from scratch on each position update. The
//! classification only depends on the step itself, the position, whether a
//! later detected step has already been reached, and whether the sequence
//! has ended (last step active or video ended). Two rules are layered on
//! top of the pure classification:
//! - `Active` is sticky until a restart from zero.
//! - A step that already became `Pending` or `Missed` is not demoted back
//!   to `Waiting` by a later update.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::model::SopStep;
use serde::Serialize;
use std::fmt;

/// A `play` event below this position counts as a restart from the beginning.
pub const RESTART_THRESHOLD_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Waiting,
    Active,
    Pending,
    Missed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            StepState::Waiting => "waiting",
            StepState::Active => "active",
            StepState::Pending => "pending",
            StepState::Missed => "missed",
        })
    }
}

/// Pure classification of a single step.
///
/// `reached` is true when the step has a timestamp and the position is at or past it.
/// `later_completed` is true when some later detected step has been reached.
/// `sequence_ended` is true once the last step is active or the video has ended.
pub fn classify(
    status: bool,
    reached: bool,
    later_completed: bool,
    sequence_ended: bool,
) -> StepState {
    if status && reached {
        StepState::Active
    } else if later_completed && !sequence_ended {
        StepState::Pending
    } else if !status && sequence_ended {
        StepState::Missed
    } else {
        StepState::Waiting
    }
}

fn merge(previous: StepState, next: StepState) -> StepState {
    match (previous, next) {
        (StepState::Active, _) => StepState::Active,
        (StepState::Pending | StepState::Missed, StepState::Waiting) => previous,
        (_, next) => next,
    }
}

/// Presentation of one step, derived from its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub state: StepState,
    pub time_label: String,
    pub confidence_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComplianceSummary {
    pub active: usize,
    pub pending: usize,
    pub missed: usize,
    pub waiting: usize,
    /// Expected orders of detected steps whose observed order differs.
    pub out_of_order: Vec<u32>,
}

impl ComplianceSummary {
    pub fn in_order(&self) -> bool {
        self.out_of_order.is_empty()
    }
}

pub struct SopTimeline {
    steps: Vec<SopStep>,
    seconds: Vec<Option<u32>>,
    states: Vec<StepState>,
    video_ended: bool,
    last_step_active: bool,
}

impl SopTimeline {
    pub fn new(steps: Vec<SopStep>) -> Self {
        let seconds = steps.iter().map(SopStep::seconds).collect();
        let states = vec![StepState::Waiting; steps.len()];
        Self {
            steps,
            seconds,
            states,
            video_ended: false,
            last_step_active: false,
        }
    }

    pub fn steps(&self) -> &[SopStep] {
        &self.steps
    }

    pub fn states(&self) -> &[StepState] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<StepState> {
        self.states.get(index).copied()
    }

    pub fn video_ended(&self) -> bool {
        self.video_ended
    }

    pub fn last_step_active(&self) -> bool {
        self.last_step_active
    }

    fn reached(&self, index: usize, position: f64) -> bool {
        matches!(self.seconds[index], Some(ts) if position >= f64::from(ts))
    }

    /// Recomputes every step for the given position.
    /// Returns the indices that became `Active` in this update, in sequence order.
    pub fn time_update(&mut self, position: f64) -> Vec<usize> {
        let count = self.steps.len();
        let completed: Vec<bool> = (0..count)
            .map(|i| self.steps[i].status && self.reached(i, position))
            .collect();
        let highest_completed = completed.iter().rposition(|&c| c);

        if count > 0 && (completed[count - 1] || self.states[count - 1] == StepState::Active) {
            if !self.last_step_active {
                debug!("last SOP step active at {:.2}s", position);
            }
            self.last_step_active = true;
        }
        let sequence_ended = self.video_ended || self.last_step_active;

        let mut activated = Vec::new();
        for i in 0..count {
            let later_completed = matches!(highest_completed, Some(h) if h > i);
            let next = classify(
                self.steps[i].status,
                completed[i],
                later_completed,
                sequence_ended,
            );
            let merged = merge(self.states[i], next);
            if merged == StepState::Active && self.states[i] != StepState::Active {
                activated.push(i);
            }
            self.states[i] = merged;
        }

        activated
    }

    /// Handles the media `play` event. Returns true when it reset the timeline.
    pub fn play(&mut self, position: f64) -> bool {
        if position < RESTART_THRESHOLD_SECS {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.video_ended = false;
        self.last_step_active = false;
        self.states.iter_mut().for_each(|s| *s = StepState::Waiting);
    }

    /// Handles the media `ended` event: everything not yet active is missed.
    pub fn ended(&mut self) {
        self.video_ended = true;
        for state in self.states.iter_mut() {
            if *state != StepState::Active {
                *state = StepState::Missed;
            }
        }
    }

    /// Position to seek to when a step is clicked. Only detected steps with a
    /// usable timestamp are clickable.
    pub fn seek_target(&self, index: usize) -> Option<u32> {
        let step = self.steps.get(index)?;
        if !step.status {
            return None;
        }
        self.seconds[index]
    }

    pub fn view(&self, index: usize) -> Option<StepView> {
        let step = self.steps.get(index)?;
        let state = self.states[index];
        let (time_label, confidence_label) = match state {
            StepState::Active => (
                step.timestamp.clone().unwrap_or_default(),
                format!("{}% confidence", (step.confidence * 100.0).round() as u32),
            ),
            StepState::Pending => ("Waiting...".to_string(), "Still monitoring".to_string()),
            StepState::Missed => ("Missed".to_string(), "Not performed".to_string()),
            StepState::Waiting => ("--:--".to_string(), "Analyzing...".to_string()),
        };
        Some(StepView {
            state,
            time_label,
            confidence_label,
        })
    }

    pub fn summary(&self) -> ComplianceSummary {
        let mut summary = ComplianceSummary::default();
        for (step, state) in self.steps.iter().zip(&self.states) {
            match state {
                StepState::Active => summary.active += 1,
                StepState::Pending => summary.pending += 1,
                StepState::Missed => summary.missed += 1,
                StepState::Waiting => summary.waiting += 1,
            }
            if let Some(actual) = step.actual_order {
                if step.status && actual != step.expected_order {
                    summary.out_of_order.push(step.expected_order);
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use StepState::*;

    fn step(order: u32, status: bool, ts: Option<&str>) -> SopStep {
        SopStep {
            expected_order: order,
            actual_order: if status { Some(order) } else { None },
            status,
            description: format!("step {}", order),
            timestamp: ts.map(str::to_string),
            confidence: 0.9,
        }
    }

    fn all_detected() -> SopTimeline {
        let ts = ["00:00:04", "00:00:11", "00:00:18", "00:00:27", "00:00:36", "00:00:45"];
        SopTimeline::new(
            ts.iter()
                .enumerate()
                .map(|(i, t)| step(i as u32 + 1, true, Some(t)))
                .collect(),
        )
    }

    fn with_skipped_step() -> SopTimeline {
        SopTimeline::new(vec![
            step(1, true, Some("00:00:04")),
            step(2, true, Some("00:00:11")),
            step(3, false, None),
            step(4, true, Some("00:00:18")),
            step(5, true, Some("00:00:36")),
            step(6, true, Some("00:00:45")),
        ])
    }

    #[test]
    fn classify_is_a_pure_function() {
        for status in [true, false] {
            for reached in [true, false] {
                for later in [true, false] {
                    for ended in [true, false] {
                        assert_eq!(
                            classify(status, reached, later, ended),
                            classify(status, reached, later, ended)
                        );
                    }
                }
            }
        }
        assert_eq!(classify(true, true, false, false), Active);
        assert_eq!(classify(true, false, true, false), Pending);
        assert_eq!(classify(false, false, true, true), Missed);
        assert_eq!(classify(false, false, false, false), Waiting);
        assert_eq!(classify(true, false, false, true), Waiting);
    }

    #[test]
    fn steps_activate_at_their_timestamps() {
        let mut timeline = all_detected();
        timeline.play(0.0);
        timeline.time_update(20.0);
        assert_eq!(
            timeline.states(),
            &[Active, Active, Active, Waiting, Waiting, Waiting]
        );
    }

    #[test]
    fn oversized_timestamp_is_never_reached() {
        let mut timeline = SopTimeline::new(vec![
            step(1, true, Some("00:00:04")),
            step(2, true, Some("1200000:00:00")),
        ]);
        assert_eq!(timeline.time_update(1.0e9), vec![0]);
        assert_eq!(timeline.states(), &[Active, Waiting]);
    }

    #[test]
    fn activation_is_reported_once() {
        let mut timeline = all_detected();
        assert_eq!(timeline.time_update(4.0), vec![0]);
        assert_eq!(timeline.time_update(4.5), Vec::<usize>::new());
        assert_eq!(timeline.time_update(19.0), vec![1, 2]);
    }

    #[test]
    fn skipped_step_is_pending_until_sequence_ends() {
        let mut timeline = with_skipped_step();
        timeline.time_update(20.0);
        assert_eq!(timeline.state(2), Some(Pending));
        assert_eq!(timeline.state(3), Some(Active));

        timeline.time_update(40.0);
        assert_eq!(timeline.state(2), Some(Pending));

        timeline.time_update(45.0);
        assert!(timeline.last_step_active());
        assert_eq!(timeline.state(2), Some(Missed));
    }

    #[test]
    fn skipped_step_waits_while_nothing_later_happened() {
        let mut timeline = with_skipped_step();
        timeline.time_update(12.0);
        assert_eq!(timeline.state(2), Some(Waiting));
    }

    #[test]
    fn detected_step_overtaken_by_a_later_one_is_pending() {
        let mut timeline = SopTimeline::new(vec![
            step(1, true, Some("00:00:30")),
            step(2, true, Some("00:00:10")),
            step(3, true, Some("00:00:50")),
        ]);
        timeline.time_update(12.0);
        assert_eq!(timeline.states(), &[Pending, Active, Waiting]);
        timeline.time_update(31.0);
        assert_eq!(timeline.states(), &[Active, Active, Waiting]);
    }

    #[test]
    fn active_never_reverts_during_a_pass() {
        let mut timeline = all_detected();
        timeline.time_update(30.0);
        timeline.time_update(5.0);
        assert_eq!(
            timeline.states(),
            &[Active, Active, Active, Active, Waiting, Waiting]
        );
    }

    #[test]
    fn ended_marks_everything_not_active_as_missed() {
        let mut timeline = with_skipped_step();
        timeline.time_update(20.0);
        timeline.ended();
        assert_eq!(
            timeline.states(),
            &[Active, Active, Missed, Active, Missed, Missed]
        );
        timeline.time_update(20.0);
        assert!(timeline
            .states()
            .iter()
            .all(|s| *s != Waiting && *s != Pending));
    }

    #[test]
    fn restart_from_zero_resets_everything() {
        let mut timeline = with_skipped_step();
        timeline.time_update(50.0);
        timeline.ended();

        assert!(!timeline.play(12.0));
        assert!(timeline.video_ended());

        assert!(timeline.play(0.4));
        assert!(timeline.states().iter().all(|s| *s == Waiting));
        assert!(!timeline.video_ended());
        assert!(!timeline.last_step_active());
    }

    #[test]
    fn only_detected_steps_are_seekable() {
        let timeline = with_skipped_step();
        assert_eq!(timeline.seek_target(3), Some(18));
        assert_eq!(timeline.seek_target(2), None);
        assert_eq!(timeline.seek_target(42), None);
    }

    #[test]
    fn views_follow_state() {
        let mut timeline = with_skipped_step();
        assert_eq!(timeline.view(0).unwrap().time_label, "--:--");
        timeline.time_update(20.0);

        let active = timeline.view(0).unwrap();
        assert_eq!(active.time_label, "00:00:04");
        assert_eq!(active.confidence_label, "90% confidence");

        let pending = timeline.view(2).unwrap();
        assert_eq!(pending.time_label, "Waiting...");
        assert_eq!(pending.confidence_label, "Still monitoring");

        timeline.ended();
        assert_eq!(timeline.view(2).unwrap().confidence_label, "Not performed");
    }

    #[test]
    fn summary_counts_states_and_order_mismatches() {
        let mut steps = vec![
            step(1, true, Some("00:00:04")),
            step(2, true, Some("00:00:08")),
            step(3, false, None),
        ];
        steps[1].actual_order = Some(3);
        let mut timeline = SopTimeline::new(steps);
        timeline.time_update(10.0);
        timeline.ended();

        let summary = timeline.summary();
        assert_eq!(summary.active, 2);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.out_of_order, vec![2]);
        assert!(!summary.in_order());
    }

    #[test]
    fn empty_sequence_is_harmless() {
        let mut timeline = SopTimeline::new(vec![]);
        assert!(timeline.time_update(10.0).is_empty());
        timeline.ended();
        assert!(!timeline.last_step_active());
    }
}
