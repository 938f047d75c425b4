mod common;

use std::time::{Duration, SystemTime};

use calc_session::basic::BasicEngine;
use calc_session::currency::{update_rates, update_rates_detailed, RateRow, SkippedRow, CURRENCY_PRECISION};
use calc_session::engine::{ExpressionEngine, UnitHandle};
use calc_session::options::OptionFlags;
use calc_session::pipeline::Severity;
use calc_session::session::Session;
use common::FakeEngine;
use pretty_assertions::assert_eq;

fn engine() -> BasicEngine {
    BasicEngine::with_definitions()
}

#[test]
fn new_currency_is_created_against_the_anchor() {
    let mut engine = engine();
    assert!(engine.resolve_unit("USD").is_none());

    assert!(update_rates(&mut engine, &[RateRow::new("USD", "1.1")], "EUR", true));

    let usd = engine.resolve_unit("USD").unwrap();
    let unit = engine.unit(usd).unwrap();
    let eur = engine.resolve_unit("EUR").unwrap();
    assert!(unit.is_currency);
    assert_eq!(unit.base, Some(eur));
    assert_eq!(unit.expression, "1.1");
    assert_eq!(unit.precision, Some(CURRENCY_PRECISION));
    assert!(unit.approximate);
    assert!(!unit.changed);
    assert_eq!(unit.category, "Currency");
    assert_eq!(unit.title, "");
    assert!(engine.stale_rate_warning());
}

#[test]
fn refreshed_rates_are_used_by_later_evaluations() {
    let mut session = Session::new(engine());
    assert!(session.update_currency_rates(&[RateRow::new("USD", "1.1")], "EUR", false));

    let result = session.calculate("10 USD to EUR", 500, OptionFlags::NONE).unwrap();
    assert_eq!(result.output, "approx. 11.00 EUR");
    assert!(result.messages.is_empty());

    assert!(session.update_currency_rates(&[RateRow::new("USD", "1/2")], "EUR", false));
    let result = session.calculate("10 USD to EUR", 500, OptionFlags::NONE).unwrap();
    assert_eq!(result.output, "approx. 5.00 EUR");
}

#[test]
fn base_alias_resolving_to_anchor_is_accepted() {
    let mut engine = engine();
    assert!(update_rates(&mut engine, &[RateRow::new("JPY", "0.0062")], "euro", false));
    assert!(engine.resolve_unit("JPY").is_some());
}

#[test]
fn wrong_base_rejects_the_whole_batch() {
    let mut engine = engine();
    update_rates(&mut engine, &[RateRow::new("USD", "1.1")], "EUR", false);
    let before = engine.currency_units();

    let rows = [RateRow::new("USD", "2"), RateRow::new("CHF", "1.05")];
    let report = update_rates_detailed(&mut engine, &rows, "USD", true);
    assert!(!report.base_accepted);
    assert!(!report.is_success());
    assert!(report.created.is_empty() && report.updated.is_empty());

    assert!(!update_rates(&mut engine, &rows, "XYZ", true));
    assert_eq!(engine.currency_units(), before);
    assert!(engine.resolve_unit("CHF").is_none());
    assert!(!engine.stale_rate_warning());
}

#[test]
fn non_currency_row_is_skipped_but_the_rest_apply() {
    let mut engine = engine();
    let rows = [RateRow::new("USD", "1.1"), RateRow::new("m", "3"), RateRow::new("GBP", "1.17")];
    let report = update_rates_detailed(&mut engine, &rows, "EUR", false);

    assert!(report.base_accepted);
    assert_eq!(report.created, vec!["USD".to_string(), "GBP".to_string()]);
    assert_eq!(report.skipped, vec![SkippedRow { index: 1, name: "m".into() }]);
    assert!(!report.is_success());

    let m = engine.resolve_unit("m").unwrap();
    assert!(!engine.unit(m).unwrap().is_currency);
    assert_eq!(engine.unit(m).unwrap().expression, "1");
    assert!(engine.resolve_unit("GBP").is_some());

    assert!(!update_rates(&mut engine, &rows, "EUR", false));
}

#[test]
fn row_for_the_anchor_itself_is_ignored() {
    let mut session = Session::new(engine());
    assert!(session.update_currency_rates(&[RateRow::new("USD", "1.1")], "EUR", false));

    let rows = [RateRow::new("EUR", "1"), RateRow::new("euro", "2"), RateRow::new("USD", "1.1")];
    let report = session.update_currency_rates_detailed(&rows, "EUR", false);
    assert!(report.is_success());
    assert_eq!(report.updated, vec!["USD".to_string()]);
    assert!(report.created.is_empty());

    let eur = session.engine().resolve_unit("EUR").unwrap();
    assert_eq!(session.engine().unit(eur).unwrap().base, None);
    let converted = session.calculate("10 USD to EUR", 500, OptionFlags::NONE).unwrap();
    assert_eq!(converted.output, "approx. 11.00 EUR");
    let plain = session.calculate("5 EUR", 500, OptionFlags::NONE).unwrap();
    assert_eq!(plain.output, "5 EUR");
    assert!(plain.messages.is_empty());
}

#[test]
fn engine_refuses_to_rebase_a_root_currency() {
    let mut engine = engine();
    let eur = engine.resolve_unit("EUR").unwrap();
    assert!(engine.currency_unit_mut(eur).is_none());
    let m = engine.resolve_unit("m").unwrap();
    assert!(engine.currency_unit_mut(m).is_none());
}

#[test]
fn fake_engine_anchor_row_is_left_alone() {
    let mut engine = FakeEngine::new();
    assert!(update_rates(&mut engine, &[RateRow::new("EUR", "3"), RateRow::new("GBP", "1.2")], "EUR", false));
    let eur = engine.unit("EUR").unwrap();
    assert_eq!(eur.base, None);
    assert_eq!(eur.expression, "1");
    assert_eq!(engine.unit("GBP").unwrap().expression, "1.2");
}

#[test]
fn reapplying_a_batch_is_idempotent() {
    let mut engine = engine();
    let rows = [RateRow::new("USD", "1.1"), RateRow::new("GBP", "1.17")];
    assert!(update_rates(&mut engine, &rows, "EUR", true));
    let first = engine.currency_units();
    let report = update_rates_detailed(&mut engine, &rows, "EUR", true);
    assert_eq!(report.updated, vec!["USD".to_string(), "GBP".to_string()]);
    assert!(report.created.is_empty());
    assert_eq!(engine.currency_units(), first);
}

#[test]
fn stale_rates_raise_a_warning_when_enabled() {
    let mut session = Session::new(engine());
    session.update_currency_rates(&[RateRow::new("USD", "1.1")], "EUR", true);

    let fresh = session.calculate("5 USD", 500, OptionFlags::NONE).unwrap();
    assert!(fresh.messages.is_empty());

    let week_ago = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);
    session.engine_mut().set_rates_timestamp(Some(week_ago));
    let stale = session.calculate("5 USD", 500, OptionFlags::NONE).unwrap();
    assert_eq!(stale.messages.len(), 1);
    assert_eq!(stale.messages[0].severity, Severity::Warning);
    assert_eq!(stale.output, "approx. 5.00 USD");

    session.engine_mut().set_stale_rate_warning(false);
    let quiet = session.calculate("5 USD", 500, OptionFlags::NONE).unwrap();
    assert!(quiet.messages.is_empty());
}

#[test]
fn invalid_rate_expression_makes_currency_unusable() {
    let mut session = Session::new(engine());
    assert!(session.update_currency_rates(&[RateRow::new("XAU", "lots")], "EUR", false));
    let result = session.calculate("1 XAU to EUR", 500, OptionFlags::NONE).unwrap();
    assert!(result.has_errors());
    assert_eq!(result.output, "undefined");
}

#[test]
fn fake_engine_sees_the_full_mutation_sequence() {
    let mut engine = FakeEngine::new();
    let ok = update_rates(&mut engine, &[RateRow::new("GBP", "1.2"), RateRow::new("NOK", "0.09")], "EUR", true);
    assert!(ok);
    let gbp = engine.unit("GBP").unwrap();
    assert_eq!(gbp.base, Some(UnitHandle(0)));
    assert_eq!(gbp.expression, "1.2");
    assert!(!gbp.changed);
    let nok = engine.unit("NOK").unwrap();
    assert_eq!(nok.precision, Some(CURRENCY_PRECISION));
    assert!(nok.approximate);
    assert_eq!(engine.stale_warning, Some(true));
    assert_eq!(engine.reloads, 1);
}

#[test]
fn rejected_batch_does_not_reload() {
    let mut engine = FakeEngine::new();
    assert!(!update_rates(&mut engine, &[RateRow::new("GBP", "1.2")], "m", true));
    assert_eq!(engine.reloads, 0);
    assert_eq!(engine.stale_warning, None);
    assert_eq!(engine.unit("GBP").unwrap().expression, "1.15");
}

#[test]
fn rate_rows_accept_value_key() {
    let rows: Vec<RateRow> = serde_json::from_str(r#"[{"name":"USD","value":"1.08"}]"#).unwrap();
    assert_eq!(rows, vec![RateRow::new("USD", "1.08")]);
}

#[test]
fn rate_rows_accept_numeric_values() {
    let rows: Vec<RateRow> =
        serde_json::from_str(r#"[{"name":"USD","value":1.2345},{"name":"JPY","rate":0.0062},{"name":"CHF","value":1}]"#)
            .unwrap();
    assert_eq!(
        rows,
        vec![RateRow::new("USD", "1.2345"), RateRow::new("JPY", "0.0062"), RateRow::new("CHF", "1")]
    );

    let mut engine = engine();
    assert!(update_rates(&mut engine, &rows, "EUR", false));
    let usd = engine.resolve_unit("USD").unwrap();
    assert_eq!(engine.unit(usd).unwrap().expression, "1.2345");

    assert!(serde_json::from_str::<RateRow>(r#"{"name":"USD","value":true}"#).is_err());
}
