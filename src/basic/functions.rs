use std::collections::HashMap;
use std::sync::Arc;

use crate::options::AngleUnit;

/// A numeric function callable from expressions. Arguments and results are
/// dimensionless.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, args: &[f64], angle: AngleUnit) -> f64;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtins::Unary::plain("sqrt", f64::sqrt));
        registry.register(builtins::Unary::plain("abs", f64::abs));
        registry.register(builtins::Unary::plain("exp", f64::exp));
        registry.register(builtins::Unary::plain("ln", f64::ln));
        registry.register(builtins::Unary::trig("sin", f64::sin));
        registry.register(builtins::Unary::trig("cos", f64::cos));
        registry.register(builtins::Unary::trig("tan", f64::tan));
        registry.register(builtins::Unary::inverse_trig("asin", f64::asin));
        registry.register(builtins::Unary::inverse_trig("acos", f64::acos));
        registry.register(builtins::Unary::inverse_trig("atan", f64::atan));
        registry.register(builtins::Log);
        registry
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }
}

pub mod builtins {
    use super::*;

    #[derive(Clone, Copy)]
    enum Angles {
        Ignore,
        Input,
        Output,
    }

    /// Single-argument function backed by an `f64` method.
    pub struct Unary {
        name: &'static str,
        f: fn(f64) -> f64,
        angles: Angles,
    }

    impl Unary {
        pub fn plain(name: &'static str, f: fn(f64) -> f64) -> Self {
            Self { name, f, angles: Angles::Ignore }
        }

        /// Argument is an angle in the session's angle unit.
        pub fn trig(name: &'static str, f: fn(f64) -> f64) -> Self {
            Self { name, f, angles: Angles::Input }
        }

        /// Result is an angle in the session's angle unit.
        pub fn inverse_trig(name: &'static str, f: fn(f64) -> f64) -> Self {
            Self { name, f, angles: Angles::Output }
        }
    }

    impl Function for Unary {
        fn name(&self) -> &'static str { self.name }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[f64], angle: AngleUnit) -> f64 {
            let x = args.first().copied().unwrap_or(f64::NAN);
            match self.angles {
                Angles::Ignore => (self.f)(x),
                Angles::Input => (self.f)(x * angle.to_radians()),
                Angles::Output => (self.f)(x) / angle.to_radians(),
            }
        }
    }

    /// `log(x)` is base 10, `log(x, b)` base `b`.
    pub struct Log;
    impl Function for Log {
        fn name(&self) -> &'static str { "log" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=2 }
        fn call(&self, args: &[f64], _angle: AngleUnit) -> f64 {
            let x = args.first().copied().unwrap_or(f64::NAN);
            match args.get(1) {
                Some(base) => x.ln() / base.ln(),
                None => x.log10(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trig_respects_angle_unit() {
        let reg = Registry::with_builtins();
        let sin = reg.get("sin").unwrap();
        assert!((sin.call(&[90.0], AngleUnit::Degrees) - 1.0).abs() < 1e-12);
        assert!((sin.call(&[100.0], AngleUnit::Gradians) - 1.0).abs() < 1e-12);
        let asin = reg.get("asin").unwrap();
        assert!((asin.call(&[1.0], AngleUnit::Degrees) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn log_with_and_without_base() {
        let log = Registry::with_builtins().get("log").unwrap();
        assert!((log.call(&[1000.0], AngleUnit::Radians) - 3.0).abs() < 1e-12);
        assert!((log.call(&[8.0, 2.0], AngleUnit::Radians) - 3.0).abs() < 1e-12);
        assert_eq!(log.arity(), 1..=2);
    }

    #[test]
    fn register_overrides_by_name() {
        let mut reg = Registry::new();
        assert!(reg.get("sqrt").is_none());
        reg.register(builtins::Unary::plain("sqrt", f64::sqrt));
        assert_eq!(reg.get("sqrt").unwrap().call(&[9.0], AngleUnit::Radians), 3.0);
    }
}
