//! Person cards with their action timelines. Independent of playback time.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::model::{Person, PersonAction};
use crate::timecode::parse_timecode;

pub const NO_ACTIONS_MESSAGE: &str = "No actions found for this person";

pub struct PersonPanel {
    persons: Vec<Person>,
    expanded: Option<usize>,
}

impl PersonPanel {
    pub fn new(persons: Vec<Person>) -> Self {
        Self {
            persons,
            expanded: None,
        }
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    fn position(&self, huid: &str) -> Option<usize> {
        self.persons.iter().position(|p| p.huid == huid)
    }

    /// Expands the card (collapsing any other) or collapses it if it was open.
    /// Returns the card's new expanded state, or `None` for an unknown person.
    pub fn toggle(&mut self, huid: &str) -> Option<bool> {
        let index = self.position(huid)?;
        if self.expanded == Some(index) {
            self.expanded = None;
            Some(false)
        } else {
            self.expanded = Some(index);
            Some(true)
        }
    }

    pub fn expanded(&self) -> Option<&Person> {
        self.expanded.map(|i| &self.persons[i])
    }

    pub fn is_expanded(&self, huid: &str) -> bool {
        self.expanded().is_some_and(|p| p.huid == huid)
    }

    pub fn action(&self, huid: &str, index: usize) -> Option<&PersonAction> {
        self.persons.get(self.position(huid)?)?.actions.get(index)
    }

    pub fn seek_target(&self, huid: &str, index: usize) -> Option<u32> {
        parse_timecode(&self.action(huid, index)?.start)
    }

    /// Text lines for a person's action list, in stored order.
    pub fn action_lines(&self, huid: &str) -> Vec<String> {
        let Some(person) = self.position(huid).map(|i| &self.persons[i]) else {
            return vec![];
        };
        if person.actions.is_empty() {
            return vec![NO_ACTIONS_MESSAGE.to_string()];
        }
        person
            .actions
            .iter()
            .map(|a| format!("{} - {}  {}", a.start, a.end, a.action))
            .collect()
    }
}
