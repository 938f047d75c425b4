//! Unit table of the bundled engine.

use crate::engine::{AliasUnitSpec, CurrencyUnitMut, UnitHandle};

/// Longest base chain followed when resolving a unit to its root.
const MAX_CHAIN: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Identifier first, then further names it can be referenced by.
    pub names: Vec<String>,
    pub category: String,
    pub title: String,
    pub singular: String,
    pub plural: String,
    /// `None` for a root unit.
    pub base: Option<UnitHandle>,
    /// `1 self = expression × base`.
    pub expression: String,
    /// Cached value of `expression`; NaN when it could not be evaluated.
    pub factor: f64,
    pub is_currency: bool,
    pub approximate: bool,
    pub precision: Option<i32>,
    pub changed: bool,
}

impl Unit {
    pub fn root(names: &[&str], category: &str, title: &str, is_currency: bool) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            category: category.to_string(),
            title: title.to_string(),
            singular: String::new(),
            plural: String::new(),
            base: None,
            expression: "1".to_string(),
            factor: 1.0,
            is_currency,
            approximate: false,
            precision: None,
            changed: false,
        }
    }

    pub fn alias(names: &[&str], title: &str, base: UnitHandle, factor: f64) -> Self {
        Self {
            base: Some(base),
            expression: factor.to_string(),
            factor,
            ..Self::root(names, "", title, false)
        }
    }

    pub fn from_spec(spec: AliasUnitSpec) -> Self {
        Self {
            names: vec![spec.name],
            category: spec.category,
            title: spec.title,
            singular: spec.singular,
            plural: spec.plural,
            base: Some(spec.base),
            expression: spec.expression,
            factor: f64::NAN,
            is_currency: spec.is_currency,
            approximate: false,
            precision: None,
            changed: true,
        }
    }

    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }
}

impl CurrencyUnitMut for Unit {
    fn set_base_unit(&mut self, base: UnitHandle) {
        self.base = Some(base);
    }

    fn set_conversion_expression(&mut self, expression: &str) {
        if self.expression != expression {
            self.expression = expression.to_string();
            self.changed = true;
        }
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

#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: Vec<Unit>,
}

impl UnitTable {
    pub fn add(&mut self, unit: Unit) -> UnitHandle {
        self.units.push(unit);
        UnitHandle(self.units.len() - 1)
    }

    pub fn get(&self, handle: UnitHandle) -> Option<&Unit> {
        self.units.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: UnitHandle) -> Option<&mut Unit> {
        self.units.get_mut(handle.0)
    }

    /// Later registrations shadow earlier ones with the same name.
    pub fn find(&self, name: &str) -> Option<UnitHandle> {
        self.units
            .iter()
            .rposition(|u| u.names.iter().any(|n| n == name))
            .map(UnitHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitHandle, &Unit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitHandle(i), u))
    }

    /// Root unit and the factor converting one `handle` into it. `None` when
    /// a factor along the chain is unusable or the chain does not end.
    pub fn to_root(&self, handle: UnitHandle) -> Option<(UnitHandle, f64)> {
        let mut current = handle;
        let mut factor = 1.0;
        for _ in 0..MAX_CHAIN {
            let unit = self.get(current)?;
            match unit.base {
                None => return Some((current, factor)),
                Some(base) => {
                    if !unit.factor.is_finite() {
                        return None;
                    }
                    factor *= unit.factor;
                    current = base;
                }
            }
        }
        None
    }

    pub fn set_factor(&mut self, handle: UnitHandle, factor: f64) {
        if let Some(unit) = self.get_mut(handle) {
            unit.factor = factor;
        }
    }
}
