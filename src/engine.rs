//! The contract this crate needs from an expression engine.
//!
//! Parsing, numeric evaluation, unit algebra and formatting all live behind
//! [`ExpressionEngine`]. The session, pipeline, currency registry and variable
//! catalog only ever talk to an engine through this trait; [`crate::basic`]
//! provides a ready-made implementation.

use std::time::Duration;

use crate::options::{EvaluationOptions, ParseOptions};
use crate::plot::PlotCapture;

/// Opaque reference to a unit known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitHandle(pub usize);

/// Opaque reference to a variable known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableHandle(pub usize);

/// Severity tag as reported by the engine. Engines may report more levels
/// than the three this crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Information,
    Warning,
    Error,
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl EngineMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// Echo of the parsed input together with the formatted result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluated {
    pub parsed: String,
    pub formatted: String,
}

/// Failures the engine cannot express as a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    RecursionLimit { depth: usize },
    Exhausted(String),
}

impl std::fmt::Display for EngineFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineFault::RecursionLimit { depth } => {
                write!(f, "expression nests deeper than {depth} levels")
            }
            EngineFault::Exhausted(what) => f.write_str(what),
        }
    }
}

/// Fields of a freshly created currency alias unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasUnitSpec {
    pub category: String,
    pub name: String,
    pub plural: String,
    pub singular: String,
    pub title: String,
    pub base: UnitHandle,
    pub expression: String,
    pub is_currency: bool,
}

impl AliasUnitSpec {
    /// A currency named only by its identifier, anchored to `base` 1:1 until
    /// its rate is set.
    pub fn currency(name: &str, base: UnitHandle) -> Self {
        Self {
            category: "Currency".to_string(),
            name: name.to_string(),
            plural: String::new(),
            singular: String::new(),
            title: String::new(),
            base,
            expression: "1".to_string(),
            is_currency: true,
        }
    }
}

/// Mutators only currency units offer. Obtained through
/// [`ExpressionEngine::currency_unit_mut`], which is the capability check.
pub trait CurrencyUnitMut {
    fn set_base_unit(&mut self, base: UnitHandle);
    fn set_conversion_expression(&mut self, expression: &str);
    fn set_approximate(&mut self, approximate: bool);
    fn set_precision(&mut self, exponent: i32);
    fn set_changed(&mut self, changed: bool);
}

pub trait ExpressionEngine {
    /// `false` until the engine has its definitions loaded.
    fn is_loaded(&self) -> bool;

    fn clear_diagnostics(&mut self);

    /// Rewrites localized numerals and operator glyphs into canonical syntax.
    fn normalize_input(&self, text: &str, options: &ParseOptions) -> String;

    /// Parses, evaluates and formats `text`, giving up after `timeout`.
    /// Plots requested by the expression are reported into `plot`.
    fn evaluate_and_format(
        &mut self,
        text: &str,
        timeout: Duration,
        options: &EvaluationOptions,
        plot: &mut PlotCapture,
    ) -> Result<Evaluated, EngineFault>;

    /// The most recent diagnostic of the last evaluation, if any.
    fn next_diagnostic(&mut self) -> Option<EngineMessage>;

    fn resolve_unit(&self, name: &str) -> Option<UnitHandle>;

    /// The unit every currency must be anchored to.
    fn anchor_currency(&self) -> Option<UnitHandle>;

    fn is_currency_unit(&self, unit: UnitHandle) -> bool;

    fn create_alias_unit(&mut self, spec: AliasUnitSpec) -> UnitHandle;

    /// `None` when `unit` is unknown or not a currency.
    fn currency_unit_mut(&mut self, unit: UnitHandle) -> Option<&mut dyn CurrencyUnitMut>;

    fn set_stale_rate_warning(&mut self, enabled: bool);

    /// Recomputes currency conversions after their expressions changed.
    fn reload_currency_table(&mut self);

    /// Every registered variable, in registration order.
    fn variables(&self) -> Vec<VariableHandle>;

    fn is_known(&self, variable: VariableHandle) -> bool;
    fn is_hidden(&self, variable: VariableHandle) -> bool;
    fn preferred_name(&self, variable: VariableHandle, abbreviated: bool, unicode: bool) -> String;
    fn description(&self, variable: VariableHandle) -> String;
    fn alias_count(&self, variable: VariableHandle) -> usize;
    /// 1-based, as engines number their registered names.
    fn alias_name(&self, variable: VariableHandle, index: usize) -> Option<String>;
}
