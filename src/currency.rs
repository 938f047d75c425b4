//! Bulk refresh of currency conversion units from an external rate table.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::engine::{AliasUnitSpec, ExpressionEngine};

/// Display precision given to every refreshed currency, as a decimal
/// exponent.
pub const CURRENCY_PRECISION: i32 = -2;

/// One rate: `1 name = rate × base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRow {
    pub name: String,
    /// Conversion expression; a JSON number is read as its decimal text.
    #[serde(alias = "value", deserialize_with = "rate_text")]
    pub rate: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RateValue {
    Text(String),
    Number(serde_json::Number),
}

fn rate_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RateValue::deserialize(deserializer)? {
        RateValue::Text(text) => text,
        RateValue::Number(n) => n.to_string(),
    })
}

impl RateRow {
    pub fn new(name: impl Into<String>, rate: impl Into<String>) -> Self {
        Self { name: name.into(), rate: rate.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub index: usize,
    pub name: String,
}

/// What a rate update did, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateUpdateReport {
    /// `false` when the base currency was not the anchor; nothing was applied.
    pub base_accepted: bool,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Rows naming an existing unit that is not a currency.
    pub skipped: Vec<SkippedRow>,
}

impl RateUpdateReport {
    pub fn is_success(&self) -> bool {
        self.base_accepted && self.skipped.is_empty()
    }
}

/// Applies `rows` relative to `base_currency` and reports overall success.
pub fn update_rates<E>(engine: &mut E, rows: &[RateRow], base_currency: &str, warn_on_stale: bool) -> bool
where
    E: ExpressionEngine + ?Sized,
{
    update_rates_detailed(engine, rows, base_currency, warn_on_stale).is_success()
}

/// Like [`update_rates`], but keeps track of which rows were created,
/// refreshed or skipped.
///
/// The whole batch is rejected without touching any unit unless
/// `base_currency` resolves to the engine's anchor currency. Rows naming a
/// non-currency unit are skipped; the remaining rows still apply. A row for
/// the anchor itself is ignored.
pub fn update_rates_detailed<E>(
    engine: &mut E,
    rows: &[RateRow],
    base_currency: &str,
    warn_on_stale: bool,
) -> RateUpdateReport
where
    E: ExpressionEngine + ?Sized,
{
    let mut report = RateUpdateReport::default();

    let base = match (engine.resolve_unit(base_currency), engine.anchor_currency()) {
        (Some(base), Some(anchor)) if base == anchor => base,
        _ => {
            warn!(base = base_currency, "rate batch rejected: base is not the anchor currency");
            return report;
        }
    };
    report.base_accepted = true;

    for (index, row) in rows.iter().enumerate() {
        let (unit, created) = match engine.resolve_unit(&row.name) {
            Some(unit) if unit == base => {
                debug!(index, name = %row.name, "ignoring rate row for the base currency");
                continue;
            }
            Some(unit) if engine.is_currency_unit(unit) => (unit, false),
            Some(_) => {
                warn!(index, name = %row.name, "skipping rate for non-currency unit");
                report.skipped.push(SkippedRow { index, name: row.name.clone() });
                continue;
            }
            None => (engine.create_alias_unit(AliasUnitSpec::currency(&row.name, base)), true),
        };

        let Some(currency) = engine.currency_unit_mut(unit) else {
            warn!(index, name = %row.name, "engine refused currency mutation");
            report.skipped.push(SkippedRow { index, name: row.name.clone() });
            continue;
        };
        currency.set_base_unit(base);
        currency.set_conversion_expression(&row.rate);
        currency.set_approximate(true);
        currency.set_precision(CURRENCY_PRECISION);
        currency.set_changed(false);

        if created {
            report.created.push(row.name.clone());
        } else {
            report.updated.push(row.name.clone());
        }
    }

    engine.set_stale_rate_warning(warn_on_stale);
    engine.reload_currency_table();
    debug!(
        created = report.created.len(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "currency rates applied"
    );
    report
}
