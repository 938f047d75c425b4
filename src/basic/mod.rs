//! A small self-contained expression engine implementing
//! [`ExpressionEngine`]: arithmetic, a handful of functions, single-dimension
//! units, currencies with refreshable rates, named constants and `plot`.

mod expression;
mod format;
pub mod functions;
mod parser;
pub mod units;
pub mod variables;

use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::engine::{
    AliasUnitSpec, CurrencyUnitMut, EngineFault, EngineMessage, Evaluated, ExpressionEngine,
    MessageKind, UnitHandle, VariableHandle,
};
use crate::options::{EvaluationOptions, ParseOptions};
use crate::plot::PlotCapture;
use expression::{Evaluator, Halt, Quantity};
use functions::Registry;
use parser::ParseError;
use units::{Unit, UnitTable};
use variables::{ExpressionName, Variable, VariableTable};

/// Rates older than this trigger the stale-rate warning.
pub const STALE_RATE_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Budget for evaluating one currency rate expression.
const RATE_EXPRESSION_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Default)]
pub struct BasicEngine {
    units: UnitTable,
    variables: VariableTable,
    functions: Registry,
    anchor: Option<UnitHandle>,
    messages: Vec<EngineMessage>,
    stale_rate_warning: bool,
    rates_refreshed_at: Option<SystemTime>,
    loaded: bool,
}

impl BasicEngine {
    /// An engine with nothing loaded. Evaluations are refused until
    /// [`BasicEngine::load_global_definitions`] runs.
    pub fn new() -> Self {
        Self { stale_rate_warning: true, ..Self::default() }
    }

    /// An engine with the built-in definitions already loaded.
    pub fn with_definitions() -> Self {
        let mut engine = Self::new();
        engine.load_global_definitions();
        engine
    }

    pub fn load_global_definitions(&mut self) {
        if self.loaded {
            return;
        }
        self.functions = Registry::with_builtins();

        let v = &mut self.variables;
        v.add(Variable::constant(
            vec![ExpressionName::abbreviation("π"), ExpressionName::abbreviation("pi")],
            "Archimedes' Constant (pi)",
            std::f64::consts::PI,
        ));
        v.add(Variable::constant(vec![ExpressionName::abbreviation("e")], "Euler's Number", std::f64::consts::E));
        v.add(Variable::constant(
            vec![
                ExpressionName::abbreviation("φ"),
                ExpressionName::long("golden"),
                ExpressionName::long("golden_ratio"),
            ],
            "Golden Ratio",
            1.618_033_988_749_895,
        ));
        v.add(Variable::constant(
            vec![ExpressionName::abbreviation("τ"), ExpressionName::abbreviation("tau")],
            "Circle Constant (tau)",
            std::f64::consts::TAU,
        ));
        v.add(
            Variable::constant(vec![ExpressionName::long("catalan")], "Catalan's Constant", 0.915_965_594_177_219)
                .hidden(),
        );
        for name in ["x", "y", "z"] {
            v.add(Variable::placeholder(name));
        }

        let u = &mut self.units;
        let m = u.add(Unit::root(&["m", "meter", "meters"], "Length", "Meter", false));
        u.add(Unit::alias(&["km", "kilometer"], "Kilometer", m, 1000.0));
        u.add(Unit::root(&["s", "second", "seconds"], "Time", "Second", false));
        u.add(Unit::root(&["g", "gram", "grams"], "Mass", "Gram", false));
        self.anchor = Some(u.add(Unit::root(&["EUR", "euro", "€"], "Currency", "Euro", true)));

        self.loaded = true;
        debug!("global definitions loaded");
    }

    pub fn unit(&self, handle: UnitHandle) -> Option<&Unit> {
        self.units.get(handle)
    }

    /// Snapshot of every currency unit, for inspection.
    pub fn currency_units(&self) -> Vec<Unit> {
        self.units.iter().filter(|(_, u)| u.is_currency).map(|(_, u)| u.clone()).collect()
    }

    pub fn stale_rate_warning(&self) -> bool {
        self.stale_rate_warning
    }

    /// Overrides when rates were last refreshed.
    pub fn set_rates_timestamp(&mut self, at: Option<SystemTime>) {
        self.rates_refreshed_at = at;
    }

    fn rates_are_stale(&self) -> bool {
        match self.rates_refreshed_at {
            None => true,
            Some(at) => at.elapsed().map(|age| age > STALE_RATE_AGE).unwrap_or(false),
        }
    }

    fn evaluate_rate(&self, expression: &str) -> f64 {
        let Ok(node) = parser::parse(expression) else {
            return f64::NAN;
        };
        let options = EvaluationOptions::default();
        let mut scratch = Vec::new();
        let mut evaluator = Evaluator {
            units: &self.units,
            variables: &self.variables,
            functions: &self.functions,
            options: &options,
            deadline: Instant::now() + RATE_EXPRESSION_TIMEOUT,
            messages: &mut scratch,
            plot: None,
            binding: None,
            used_currency: false,
        };
        match evaluator.eval(&node) {
            Ok(q) if q.dimension.is_none() && !q.symbolic && scratch.is_empty() => q.value,
            _ => f64::NAN,
        }
    }

    fn render(&self, q: &Quantity, options: &EvaluationOptions) -> String {
        let print = &options.print;
        let (value, suffix) = match q.display.and_then(|d| self.units.to_root(d).map(|(_, f)| (d, f))) {
            Some((display, factor)) => {
                let name = self.units.get(display).map(Unit::display_name).unwrap_or_default();
                (q.value / factor, format!(" {name}"))
            }
            None => (q.value, String::new()),
        };
        let number = if q.approximate && value.is_finite() {
            format::approximate(value, q.precision, print)
        } else {
            format::exact(value, print)
        };
        if value.is_nan() {
            number
        } else {
            format!("{number}{suffix}")
        }
    }
}

impl ExpressionEngine for BasicEngine {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn clear_diagnostics(&mut self) {
        self.messages.clear();
    }

    fn normalize_input(&self, text: &str, options: &ParseOptions) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '×' | '·' | '⋅' | '∙' => out.push('*'),
                '÷' | '∕' => out.push('/'),
                '−' | '–' => out.push('-'),
                '²' => out.push_str("^2"),
                '³' => out.push_str("^3"),
                ',' if options.decimal_comma => out.push('.'),
                ';' if options.decimal_comma => out.push(','),
                _ => out.push(c),
            }
        }
        out.trim().to_string()
    }

    fn evaluate_and_format(
        &mut self,
        text: &str,
        timeout: Duration,
        options: &EvaluationOptions,
        plot: &mut PlotCapture,
    ) -> Result<Evaluated, EngineFault> {
        let node = match parser::parse(text) {
            Ok(node) => node,
            Err(ParseError::TooDeep(depth)) => return Err(EngineFault::RecursionLimit { depth }),
            Err(err) => {
                self.messages.push(EngineMessage::new(MessageKind::Error, err.to_string()));
                return Ok(Evaluated { parsed: text.to_string(), formatted: String::new() });
            }
        };
        let parsed = format::echo(&node, &options.print);

        let mut messages = Vec::new();
        let mut evaluator = Evaluator {
            units: &self.units,
            variables: &self.variables,
            functions: &self.functions,
            options,
            deadline: Instant::now() + timeout,
            messages: &mut messages,
            plot: Some(plot),
            binding: None,
            used_currency: false,
        };
        let outcome = evaluator.eval(&node);
        let used_currency = evaluator.used_currency;

        if used_currency && self.stale_rate_warning && self.rates_are_stale() {
            messages.insert(0, EngineMessage::new(MessageKind::Warning, "Exchange rates may be out of date."));
        }

        let formatted = match outcome {
            Ok(q) if q.symbolic => parsed.clone(),
            Ok(q) => self.render(&q, options),
            Err(Halt::Timeout) => {
                warn!(?timeout, "evaluation timed out");
                messages.push(EngineMessage::new(MessageKind::Error, "Timeout reached."));
                String::new()
            }
        };
        self.messages.extend(messages);
        Ok(Evaluated { parsed, formatted })
    }

    fn next_diagnostic(&mut self) -> Option<EngineMessage> {
        self.messages.pop()
    }

    fn resolve_unit(&self, name: &str) -> Option<UnitHandle> {
        self.units.find(name)
    }

    fn anchor_currency(&self) -> Option<UnitHandle> {
        self.anchor
    }

    fn is_currency_unit(&self, unit: UnitHandle) -> bool {
        self.units.get(unit).is_some_and(|u| u.is_currency)
    }

    fn create_alias_unit(&mut self, spec: AliasUnitSpec) -> UnitHandle {
        self.units.add(Unit::from_spec(spec))
    }

    fn currency_unit_mut(&mut self, unit: UnitHandle) -> Option<&mut dyn CurrencyUnitMut> {
        self.units
            .get_mut(unit)
            .filter(|u| u.is_currency && u.base.is_some())
            .map(|u| u as &mut dyn CurrencyUnitMut)
    }

    fn set_stale_rate_warning(&mut self, enabled: bool) {
        self.stale_rate_warning = enabled;
    }

    fn reload_currency_table(&mut self) {
        let factors: Vec<(UnitHandle, f64)> = self
            .units
            .iter()
            .filter(|(_, u)| u.is_currency && u.base.is_some())
            .map(|(h, u)| (h, self.evaluate_rate(&u.expression)))
            .collect();
        for (handle, factor) in factors {
            if !factor.is_finite() || factor <= 0.0 {
                warn!(unit = ?handle, "currency rate expression did not evaluate to a positive number");
            }
            self.units.set_factor(handle, factor);
        }
        self.rates_refreshed_at = Some(SystemTime::now());
    }

    fn variables(&self) -> Vec<VariableHandle> {
        self.variables.handles().collect()
    }

    fn is_known(&self, variable: VariableHandle) -> bool {
        self.variables.get(variable).is_some_and(Variable::is_known)
    }

    fn is_hidden(&self, variable: VariableHandle) -> bool {
        self.variables.get(variable).is_some_and(|v| v.hidden)
    }

    fn preferred_name(&self, variable: VariableHandle, abbreviated: bool, unicode: bool) -> String {
        self.variables
            .get(variable)
            .map(|v| v.preferred_name(abbreviated, unicode).to_string())
            .unwrap_or_default()
    }

    fn description(&self, variable: VariableHandle) -> String {
        self.variables.get(variable).map(|v| v.title.clone()).unwrap_or_default()
    }

    fn alias_count(&self, variable: VariableHandle) -> usize {
        self.variables.get(variable).map_or(0, |v| v.names.len())
    }

    fn alias_name(&self, variable: VariableHandle, index: usize) -> Option<String> {
        let v = self.variables.get(variable)?;
        v.names.get(index.checked_sub(1)?).map(|n| n.name.clone())
    }
}
