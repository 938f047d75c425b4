// src/basic/expression.rs
use std::time::Instant;

use super::format;
use super::functions::Registry;
use super::units::UnitTable;
use super::variables::VariableTable;
use crate::engine::{EngineMessage, MessageKind, UnitHandle};
use crate::options::EvaluationOptions;
use crate::plot::{PlotCapture, PlotPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Implicit multiplication, as in `10 USD`.
    Juxtapose,
}

impl BinOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Juxtapose => 2,
            BinOp::Pow => 3,
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Mul | BinOp::Juxtapose)
    }

    pub fn symbol(self, unicode: bool) -> &'static str {
        match (self, unicode) {
            (BinOp::Add, _) => " + ",
            (BinOp::Sub, false) => " - ",
            (BinOp::Sub, true) => " − ",
            (BinOp::Mul, false) => " * ",
            (BinOp::Mul, true) => " × ",
            (BinOp::Div, _) => "/",
            (BinOp::Pow, _) => "^",
            (BinOp::Juxtapose, _) => " ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Ident(String),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call { name: String, args: Vec<Node> },
    Convert(Box<Node>, String),
}

/// Result of evaluating a node: a magnitude expressed in the root unit of its
/// dimension, plus the unit it should be shown in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub dimension: Option<UnitHandle>,
    pub display: Option<UnitHandle>,
    pub approximate: bool,
    pub precision: Option<i32>,
    /// Contains a symbol with no value; shown as its parsed form.
    pub symbolic: bool,
}

impl Quantity {
    pub fn number(value: f64) -> Self {
        Self { value, dimension: None, display: None, approximate: false, precision: None, symbolic: false }
    }

    fn undefined() -> Self {
        Self::number(f64::NAN)
    }

    fn symbolic() -> Self {
        Self { symbolic: true, ..Self::undefined() }
    }

    /// Carries approximation and symbol markers of both operands into `self`.
    fn merged(mut self, other: &Quantity) -> Self {
        self.approximate |= other.approximate;
        self.symbolic |= other.symbolic;
        self.precision = match (self.precision, other.precision) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }
}

/// Why an evaluation stopped before producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Timeout,
}

/// Default number of intervals `plot` samples.
pub const PLOT_STEPS: f64 = 100.0;

pub struct Evaluator<'a> {
    pub units: &'a UnitTable,
    pub variables: &'a VariableTable,
    pub functions: &'a Registry,
    pub options: &'a EvaluationOptions,
    pub deadline: Instant,
    pub messages: &'a mut Vec<EngineMessage>,
    pub plot: Option<&'a mut PlotCapture>,
    /// Value bound to `x` while sampling a plot.
    pub binding: Option<f64>,
    pub used_currency: bool,
}

impl<'a> Evaluator<'a> {
    fn error(&mut self, text: impl Into<String>) -> Quantity {
        self.messages.push(EngineMessage::new(MessageKind::Error, text));
        Quantity::undefined()
    }

    fn check_deadline(&self) -> Result<(), Halt> {
        if Instant::now() >= self.deadline {
            Err(Halt::Timeout)
        } else {
            Ok(())
        }
    }

    pub fn eval(&mut self, node: &Node) -> Result<Quantity, Halt> {
        self.check_deadline()?;
        Ok(match node {
            Node::Number(v) => Quantity::number(*v),
            Node::Ident(name) => self.identifier(name),
            Node::Neg(inner) => {
                let q = self.eval(inner)?;
                Quantity { value: -q.value, ..q }
            }
            Node::Binary(op, left, right) => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.binary(*op, l, r)
            }
            Node::Call { name, args } if name == "plot" => self.plot(args)?,
            Node::Call { name, args } => self.call(name, args)?,
            Node::Convert(inner, unit) => {
                let q = self.eval(inner)?;
                self.convert(q, unit)
            }
        })
    }

    fn identifier(&mut self, name: &str) -> Quantity {
        if name == "x" {
            if let Some(x) = self.binding {
                return Quantity::number(x);
            }
        }
        if let Some(variable) = self.variables.find(name) {
            return match variable.value {
                Some(value) => Quantity::number(value),
                None => Quantity::symbolic(),
            };
        }
        if let Some(handle) = self.units.find(name) {
            return self.unit(handle, name);
        }
        if self.options.parse.unknowns_enabled {
            return Quantity::symbolic();
        }
        self.error(format!("Unknown variable or unit: {name}."))
    }

    fn unit(&mut self, handle: UnitHandle, name: &str) -> Quantity {
        let Some(unit) = self.units.get(handle) else {
            return self.error(format!("Unknown variable or unit: {name}."));
        };
        let (approximate, precision, is_currency) = (unit.approximate, unit.precision, unit.is_currency);
        let Some((root, factor)) = self.units.to_root(handle) else {
            return self.error(format!("No usable conversion for {name}."));
        };
        self.used_currency |= is_currency && root != handle;
        Quantity {
            value: factor,
            dimension: Some(root),
            display: Some(handle),
            approximate,
            precision,
            symbolic: false,
        }
    }

    fn binary(&mut self, op: BinOp, l: Quantity, r: Quantity) -> Quantity {
        let merged = l.merged(&r);
        if merged.symbolic {
            return merged;
        }
        match op {
            BinOp::Add | BinOp::Sub => {
                if l.dimension != r.dimension {
                    return self.error("Incompatible units.");
                }
                let value = if op == BinOp::Add { l.value + r.value } else { l.value - r.value };
                Quantity { value, display: l.display.or(r.display), ..merged }
            }
            BinOp::Mul | BinOp::Juxtapose => {
                if l.dimension.is_some() && r.dimension.is_some() {
                    return self.error("Compound units are not supported.");
                }
                Quantity {
                    value: l.value * r.value,
                    dimension: l.dimension.or(r.dimension),
                    display: l.display.or(r.display),
                    ..merged
                }
            }
            BinOp::Div => {
                if r.value == 0.0 {
                    return self.error("Division by zero.");
                }
                let (dimension, display) = match (l.dimension, r.dimension) {
                    (_, None) => (l.dimension, l.display),
                    (Some(a), Some(b)) if a == b => (None, None),
                    _ => return self.error("Inverse units are not supported."),
                };
                Quantity { value: l.value / r.value, dimension, display, ..merged }
            }
            BinOp::Pow => {
                if l.dimension.is_some() || r.dimension.is_some() {
                    return self.error("Powers of units are not supported.");
                }
                Quantity { value: l.value.powf(r.value), ..merged }
            }
        }
    }

    fn convert(&mut self, q: Quantity, unit: &str) -> Quantity {
        if q.symbolic {
            return q;
        }
        let Some(handle) = self.units.find(unit) else {
            return self.error(format!("Unknown unit: {unit}."));
        };
        let target = self.unit(handle, unit);
        if target.value.is_nan() {
            return target;
        }
        if target.dimension != q.dimension {
            return self.error("Incompatible units.");
        }
        Quantity { display: Some(handle), ..q.merged(&target) }
    }

    fn call(&mut self, name: &str, args: &[Node]) -> Result<Quantity, Halt> {
        let Some(function) = self.functions.get(name) else {
            return Ok(self.error(format!("Unknown function: {name}.")));
        };
        if !function.arity().contains(&args.len()) {
            return Ok(self.error(format!("Wrong number of arguments for {name}.")));
        }
        let mut values = Vec::with_capacity(args.len());
        let mut acc = Quantity::number(0.0);
        for arg in args {
            let q = self.eval(arg)?;
            if q.dimension.is_some() {
                return Ok(self.error(format!("{name} expects a dimensionless argument.")));
            }
            acc = acc.merged(&q);
            values.push(q.value);
        }
        if acc.symbolic {
            return Ok(acc);
        }
        Ok(Quantity { value: function.call(&values, self.options.parse.angle_unit), ..acc })
    }

    /// `plot(expr, min, max[, steps])` samples `expr` over `x` and reports
    /// the series to the plot capture. Evaluates to 1.
    fn plot(&mut self, args: &[Node]) -> Result<Quantity, Halt> {
        if !(3..=4).contains(&args.len()) {
            return Ok(self.error("Wrong number of arguments for plot."));
        }
        let mut bounds = [0.0, 0.0, PLOT_STEPS];
        for (slot, arg) in bounds.iter_mut().zip(&args[1..]) {
            let q = self.eval(arg)?;
            if q.dimension.is_some() || q.symbolic || !q.value.is_finite() {
                return Ok(self.error("plot expects numeric bounds."));
            }
            *slot = q.value;
        }
        let [min, max, steps] = bounds;
        if max <= min || steps < 1.0 {
            return Ok(self.error("plot expects min < max and at least one step."));
        }
        let steps = steps.floor();
        let width = (max - min) / steps;

        let outer = self.binding;
        let mut points = Vec::new();
        let mut i = 0.0;
        while i <= steps {
            self.check_deadline()?;
            let x = min + i * width;
            self.binding = Some(x);
            let y = self.eval(&args[0]);
            self.binding = outer;
            let y = y?;
            if y.value.is_finite() && !y.symbolic {
                points.push((x, y.value));
            }
            i += 1.0;
        }

        let title = format::echo(&args[0], &self.options.print);
        let payload = PlotPayload::new(format!(
            "set xrange [{min}:{max}]\nplot \"1\" title \"{title}\" with lines"
        ))
        .with_series("1", PlotPayload::series_text(points));
        if let Some(capture) = self.plot.as_deref_mut() {
            capture.set(payload);
        }
        Ok(Quantity::number(1.0))
    }
}
