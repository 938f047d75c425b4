//! Explicit evaluation context: one engine, its options and the plot slot.
//!
//! A session is not synchronized. Callers that share one across threads must
//! serialize access themselves (see [`crate::Calculator`]), including rate
//! updates relative to evaluations that read currencies.

use crate::catalog::{self, VariableEntry};
use crate::currency::{self, RateRow, RateUpdateReport};
use crate::engine::ExpressionEngine;
use crate::errors::Result;
use crate::options::{EvaluationOptions, OptionFlags};
use crate::pipeline::{self, EvaluationResult};
use crate::plot::PlotCapture;

pub struct Session<E> {
    engine: E,
    options: EvaluationOptions,
    plot: PlotCapture,
}

impl<E: ExpressionEngine> Session<E> {
    /// Wraps `engine` with the default options: radians, unknowns disabled,
    /// plain decimal output with a lowercase `e` exponent and ASCII signs.
    pub fn new(engine: E) -> Self {
        Self { engine, options: EvaluationOptions::default(), plot: PlotCapture::new() }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut EvaluationOptions {
        &mut self.options
    }

    /// Applies `flags` to the session options (they persist) and evaluates
    /// `expression` under them. A rejected timeout leaves the options as
    /// they were.
    pub fn calculate(&mut self, expression: &str, timeout_ms: i64, flags: OptionFlags) -> Result<EvaluationResult> {
        pipeline::checked_timeout(timeout_ms)?;
        flags.apply(&mut self.options);
        pipeline::evaluate(&mut self.engine, &mut self.plot, expression, timeout_ms, &self.options)
    }

    /// Textual option command, e.g. `angle 2`. Returns `false` and changes
    /// nothing when the command is not understood.
    pub fn set_option(&mut self, command: &str) -> bool {
        match self.options.set_option(command) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "option rejected");
                false
            }
        }
    }

    pub fn list_variables(&self) -> impl Iterator<Item = VariableEntry> + '_ {
        catalog::list_variables(&self.engine)
    }

    pub fn update_currency_rates(&mut self, rows: &[RateRow], base_currency: &str, warn_on_stale: bool) -> bool {
        currency::update_rates(&mut self.engine, rows, base_currency, warn_on_stale)
    }

    pub fn update_currency_rates_detailed(
        &mut self,
        rows: &[RateRow],
        base_currency: &str,
        warn_on_stale: bool,
    ) -> RateUpdateReport {
        currency::update_rates_detailed(&mut self.engine, rows, base_currency, warn_on_stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::BasicEngine;
    use crate::errors::CalcError;
    use crate::options::AngleUnit;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejected_timeout_keeps_options() {
        let mut session = Session::new(BasicEngine::with_definitions());
        let err = session.calculate("sin(90)", 0, OptionFlags::DEGREES | OptionFlags::UNICODE);
        assert!(matches!(err, Err(CalcError::InvalidTimeout(0))));
        assert_eq!(session.options(), &EvaluationOptions::default());

        session.calculate("sin(90)", 500, OptionFlags::DEGREES).unwrap();
        assert_eq!(session.options().parse.angle_unit, AngleUnit::Degrees);
    }
}
