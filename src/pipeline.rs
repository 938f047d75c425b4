//! One evaluate-and-format call: reset per-call state, run the engine under a
//! time budget, then collect the diagnostic and any captured plot.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{ExpressionEngine, MessageKind};
use crate::errors::{CalcError, Result};
use crate::options::EvaluationOptions;
use crate::plot::{PlotCapture, PlotPayload};

pub const DEFAULT_TIMEOUT_MS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl From<MessageKind> for Severity {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Information => Severity::Info,
            MessageKind::Warning => Severity::Warning,
            MessageKind::Error | MessageKind::Other(_) => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.text)
    }
}

/// Response of one `calculate` call.
///
/// `plot` is absent (not an empty payload) when the expression did not plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub input: String,
    pub output: String,
    pub messages: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<PlotPayload>,
}

impl EvaluationResult {
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }
}

/// Converts a caller timeout, refusing zero and negative values.
pub fn checked_timeout(timeout_ms: i64) -> Result<Duration> {
    match u64::try_from(timeout_ms) {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(CalcError::InvalidTimeout(timeout_ms)),
    }
}

/// Evaluates `expression` and assembles the response.
///
/// Malformed input and timeouts come back as an `Error` diagnostic. Only a
/// non-positive timeout, an unloaded engine or an engine resource fault fail
/// the call itself.
pub fn evaluate<E>(
    engine: &mut E,
    plot: &mut PlotCapture,
    expression: &str,
    timeout_ms: i64,
    options: &EvaluationOptions,
) -> Result<EvaluationResult>
where
    E: ExpressionEngine + ?Sized,
{
    let timeout = checked_timeout(timeout_ms)?;
    if !engine.is_loaded() {
        return Err(CalcError::EngineUnavailable);
    }

    engine.clear_diagnostics();
    plot.reset();

    let canonical = engine.normalize_input(expression, &options.parse);
    debug!(input = %canonical, ?timeout, "evaluating");
    let evaluated = engine
        .evaluate_and_format(&canonical, timeout, options, plot)
        .map_err(|fault| CalcError::ResourceExhausted(fault.to_string()))?;

    let messages = engine
        .next_diagnostic()
        .map(|message| Diagnostic { severity: message.kind.into(), text: message.text })
        .into_iter()
        .collect();

    Ok(EvaluationResult {
        input: evaluated.parsed,
        output: evaluated.formatted,
        messages,
        plot: plot.peek().cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_severities_are_errors() {
        assert_eq!(Severity::from(MessageKind::Information), Severity::Info);
        assert_eq!(Severity::from(MessageKind::Warning), Severity::Warning);
        assert_eq!(Severity::from(MessageKind::Error), Severity::Error);
        assert_eq!(Severity::from(MessageKind::Other(4)), Severity::Error);
    }

    #[test]
    fn diagnostic_display_prefixes_severity() {
        let d = Diagnostic { severity: Severity::Warning, text: "careful".into() };
        assert_eq!(d.to_string(), "Warning: careful");
    }

    #[test]
    fn plot_field_is_omitted_when_absent() {
        let result = EvaluationResult {
            input: "1".into(),
            output: "1".into(),
            messages: Vec::new(),
            plot: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("plot").is_none());
        assert_eq!(json["messages"], serde_json::json!([]));
    }
}
