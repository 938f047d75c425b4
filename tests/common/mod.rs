#![allow(dead_code)]

use std::time::Duration;

use calc_session::engine::{
    AliasUnitSpec, CurrencyUnitMut, EngineFault, EngineMessage, Evaluated, ExpressionEngine,
    UnitHandle, VariableHandle,
};
use calc_session::options::{EvaluationOptions, ParseOptions};
use calc_session::plot::{PlotCapture, PlotPayload};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeUnit {
    pub name: String,
    pub currency: bool,
    pub base: Option<UnitHandle>,
    pub expression: String,
    pub approximate: bool,
    pub precision: Option<i32>,
    pub changed: bool,
}

impl CurrencyUnitMut for FakeUnit {
    fn set_base_unit(&mut self, base: UnitHandle) {
        self.base = Some(base);
    }
    fn set_conversion_expression(&mut self, expression: &str) {
        self.expression = expression.to_string();
        self.changed = true;
    }
    fn set_approximate(&mut self, approximate: bool) {
        self.approximate = approximate;
    }
    fn set_precision(&mut self, exponent: i32) {
        self.precision = Some(exponent);
    }
    fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }
}

#[derive(Debug, Clone)]
pub struct FakeVariable {
    pub preferred: String,
    pub description: String,
    pub names: Vec<String>,
    pub known: bool,
    pub hidden: bool,
}

impl FakeVariable {
    pub fn new(preferred: &str, names: &[&str]) -> Self {
        Self {
            preferred: preferred.to_string(),
            description: format!("{preferred} constant"),
            names: names.iter().map(|n| n.to_string()).collect(),
            known: true,
            hidden: false,
        }
    }
}

/// Engine whose behaviour during the next evaluation is scripted by the test.
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub loaded: bool,
    /// Emitted by the next evaluation, most recent last.
    pub emit: Vec<EngineMessage>,
    pub plot: Option<PlotPayload>,
    pub fault: Option<EngineFault>,
    pub messages: Vec<EngineMessage>,
    pub evaluations: Vec<(String, Duration)>,
    pub units: Vec<FakeUnit>,
    pub variables: Vec<FakeVariable>,
    pub stale_warning: Option<bool>,
    pub reloads: usize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            loaded: true,
            units: vec![
                FakeUnit {
                    name: "EUR".into(),
                    currency: true,
                    base: None,
                    expression: "1".into(),
                    approximate: false,
                    precision: None,
                    changed: false,
                },
                FakeUnit {
                    name: "m".into(),
                    currency: false,
                    base: None,
                    expression: "1".into(),
                    approximate: false,
                    precision: None,
                    changed: false,
                },
                FakeUnit {
                    name: "GBP".into(),
                    currency: true,
                    base: Some(UnitHandle(0)),
                    expression: "1.15".into(),
                    approximate: true,
                    precision: Some(-2),
                    changed: false,
                },
            ],
            ..Self::default()
        }
    }

    pub fn unit(&self, name: &str) -> Option<&FakeUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

impl ExpressionEngine for FakeEngine {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn clear_diagnostics(&mut self) {
        self.messages.clear();
    }

    fn normalize_input(&self, text: &str, _options: &ParseOptions) -> String {
        text.trim().to_string()
    }

    fn evaluate_and_format(
        &mut self,
        text: &str,
        timeout: Duration,
        _options: &EvaluationOptions,
        plot: &mut PlotCapture,
    ) -> Result<Evaluated, EngineFault> {
        self.evaluations.push((text.to_string(), timeout));
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        if let Some(payload) = self.plot.take() {
            plot.set(payload);
        }
        self.messages.append(&mut self.emit);
        Ok(Evaluated { parsed: text.to_string(), formatted: format!("= {text}") })
    }

    fn next_diagnostic(&mut self) -> Option<EngineMessage> {
        self.messages.pop()
    }

    fn resolve_unit(&self, name: &str) -> Option<UnitHandle> {
        self.units.iter().position(|u| u.name == name).map(UnitHandle)
    }

    fn anchor_currency(&self) -> Option<UnitHandle> {
        Some(UnitHandle(0))
    }

    fn is_currency_unit(&self, unit: UnitHandle) -> bool {
        self.units.get(unit.0).is_some_and(|u| u.currency)
    }

    fn create_alias_unit(&mut self, spec: AliasUnitSpec) -> UnitHandle {
        self.units.push(FakeUnit {
            name: spec.name,
            currency: spec.is_currency,
            base: Some(spec.base),
            expression: spec.expression,
            approximate: false,
            precision: None,
            changed: true,
        });
        UnitHandle(self.units.len() - 1)
    }

    fn currency_unit_mut(&mut self, unit: UnitHandle) -> Option<&mut dyn CurrencyUnitMut> {
        self.units
            .get_mut(unit.0)
            .filter(|u| u.currency)
            .map(|u| u as &mut dyn CurrencyUnitMut)
    }

    fn set_stale_rate_warning(&mut self, enabled: bool) {
        self.stale_warning = Some(enabled);
    }

    fn reload_currency_table(&mut self) {
        self.reloads += 1;
    }

    fn variables(&self) -> Vec<VariableHandle> {
        (0..self.variables.len()).map(VariableHandle).collect()
    }

    fn is_known(&self, variable: VariableHandle) -> bool {
        self.variables[variable.0].known
    }

    fn is_hidden(&self, variable: VariableHandle) -> bool {
        self.variables[variable.0].hidden
    }

    fn preferred_name(&self, variable: VariableHandle, abbreviated: bool, unicode: bool) -> String {
        assert!(abbreviated && unicode, "catalog must ask for abbreviated unicode names");
        self.variables[variable.0].preferred.clone()
    }

    fn description(&self, variable: VariableHandle) -> String {
        self.variables[variable.0].description.clone()
    }

    fn alias_count(&self, variable: VariableHandle) -> usize {
        self.variables[variable.0].names.len()
    }

    fn alias_name(&self, variable: VariableHandle, index: usize) -> Option<String> {
        self.variables[variable.0].names.get(index.checked_sub(1)?).cloned()
    }
}
