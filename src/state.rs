use crate::format::status_label;
use crate::models::{ControlKey, ControlValue};
use std::collections::HashMap;

/// Everything the controller knows about one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub displayed: ControlValue,
    /// Last value the server accepted, or the rendered value if none yet.
    pub confirmed: ControlValue,
    /// Sequence number of the request that produced `confirmed`.
    pub confirmed_seq: u64,
    /// Sequence number of the most recently issued request.
    pub latest: u64,
    /// Sequence number still waiting for an answer, if any.
    pub pending: Option<u64>,
}

impl ControlState {
    pub fn new(value: ControlValue) -> Self {
        Self {
            displayed: value.clone(),
            confirmed: value,
            confirmed_seq: 0,
            latest: 0,
            pending: None,
        }
    }

    /// Records a value the server accepted. Answers older than the one already
    /// recorded are ignored.
    pub fn confirm(&mut self, seq: u64, value: &ControlValue) {
        if seq > self.confirmed_seq {
            self.confirmed = value.clone();
            self.confirmed_seq = seq;
        }
    }

    pub fn roll_back(&mut self) {
        self.displayed = self.confirmed.clone();
    }
}

/// Status badge bound to a control and rewritten after a confirmed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub prefix: String,
    pub class: String,
    pub label: String,
}

impl Badge {
    pub fn new(prefix: impl Into<String>, value: &str) -> Self {
        let prefix = prefix.into();
        Self {
            class: format!("{prefix} {value}"),
            label: status_label(value),
            prefix,
        }
    }

    pub fn show(&mut self, value: &str) {
        self.class = format!("{} {value}", self.prefix);
        self.label = status_label(value);
    }
}

/// The view model the dashboard renders from.
#[derive(Debug, Default)]
pub struct BoardState {
    pub controls: HashMap<ControlKey, ControlState>,
    pub badges: HashMap<ControlKey, Badge>,
}

impl BoardState {
    pub fn displayed(&self, key: &ControlKey) -> Option<&ControlValue> {
        self.controls.get(key).map(|control| &control.displayed)
    }
}
