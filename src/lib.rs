pub mod basic;
pub mod catalog;
pub mod currency;
pub mod engine;
pub mod errors;
pub mod options;
pub mod pipeline;
pub mod plot;
pub mod session;

use std::sync::{Mutex, MutexGuard, PoisonError};

use basic::BasicEngine;
use catalog::VariableEntry;
use currency::{RateRow, RateUpdateReport};
use errors::Result;
use pipeline::EvaluationResult;
use session::Session;

pub use options::OptionFlags;
pub use pipeline::DEFAULT_TIMEOUT_MS;

/// Library feature version reported to callers.
pub const VERSION: u32 = 1;

pub fn info() -> &'static str {
    concat!("calc-session ", env!("CARGO_PKG_VERSION"), " with the bundled basic engine")
}

/// Shareable front end over one [`Session`] with the bundled engine.
///
/// Every call takes the session lock, so evaluations, option changes and
/// rate updates run one at a time. A long evaluation holds the lock for up to
/// its timeout.
pub struct Calculator {
    session: Mutex<Session<BasicEngine>>,
}

impl Calculator {
    pub fn new() -> Self {
        Self::from_session(Session::new(BasicEngine::with_definitions()))
    }

    pub fn from_session(session: Session<BasicEngine>) -> Self {
        Self { session: Mutex::new(session) }
    }

    fn lock(&self) -> MutexGuard<'_, Session<BasicEngine>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calculate(&self, expression: &str, timeout_ms: i64, flags: OptionFlags) -> Result<EvaluationResult> {
        self.lock().calculate(expression, timeout_ms, flags)
    }

    /// Same as [`Calculator::calculate`] with the default timeout and no flags.
    pub fn calculate_default(&self, expression: &str) -> Result<EvaluationResult> {
        self.calculate(expression, DEFAULT_TIMEOUT_MS, OptionFlags::NONE)
    }

    pub fn set_option(&self, command: &str) -> bool {
        self.lock().set_option(command)
    }

    pub fn list_variables(&self) -> Vec<VariableEntry> {
        self.lock().list_variables().collect()
    }

    pub fn update_currency_rates(&self, rows: &[RateRow], base_currency: &str, warn_on_stale: bool) -> bool {
        self.lock().update_currency_rates(rows, base_currency, warn_on_stale)
    }

    pub fn update_currency_rates_detailed(
        &self,
        rows: &[RateRow],
        base_currency: &str,
        warn_on_stale: bool,
    ) -> RateUpdateReport {
        self.lock().update_currency_rates_detailed(rows, base_currency, warn_on_stale)
    }

    pub fn info(&self) -> &'static str {
        info()
    }

    pub fn version(&self) -> u32 {
        VERSION
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}
