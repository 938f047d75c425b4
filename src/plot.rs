//! Single-slot capture for plot output produced while an expression runs.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Plot output of one evaluation: the sampled series keyed by series name,
/// plus the command text that draws them.
///
/// Each series is one point per line, `x` and `y` separated by a space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPayload {
    pub data: BTreeMap<String, String>,
    pub commands: String,
}

impl PlotPayload {
    pub fn new(commands: impl Into<String>) -> Self {
        Self { data: BTreeMap::new(), commands: commands.into() }
    }

    pub fn with_series(mut self, name: impl Into<String>, points: impl Into<String>) -> Self {
        self.data.insert(name.into(), points.into());
        self
    }

    /// Renders `(x, y)` pairs in the series text format.
    pub fn series_text(points: impl IntoIterator<Item = (f64, f64)>) -> String {
        points.into_iter().map(|(x, y)| format!("{x} {y}")).join("\n")
    }
}

/// Holds at most one [`PlotPayload`].
///
/// The session resets it before every evaluation and hands it to the engine
/// as the place to report plots; a second plot in the same evaluation
/// replaces the first. Reading does not clear the slot.
#[derive(Debug, Default)]
pub struct PlotCapture {
    slot: Option<PlotPayload>,
}

impl PlotCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.slot = None;
    }

    pub fn set(&mut self, payload: PlotPayload) {
        tracing::debug!(series = payload.data.len(), "plot captured");
        self.slot = Some(payload);
    }

    pub fn peek(&self) -> Option<&PlotPayload> {
        self.slot.as_ref()
    }
}
