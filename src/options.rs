//! Evaluation and print options shared by every call on a session.
//!
//! The options live for as long as the session does. Toggles made through
//! [`OptionFlags`] or [`EvaluationOptions::set_option`] are not scoped to one
//! call: every later call sees them.

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    None,
    #[default]
    Radians,
    Degrees,
    Gradians,
}

impl AngleUnit {
    /// Factor turning an angle in this unit into radians.
    pub fn to_radians(self) -> f64 {
        match self {
            AngleUnit::None | AngleUnit::Radians => 1.0,
            AngleUnit::Degrees => std::f64::consts::PI / 180.0,
            AngleUnit::Gradians => std::f64::consts::PI / 200.0,
        }
    }
}

/// Whether a non-decimal result carries a base prefix such as `0x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseDisplay {
    #[default]
    None,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitGrouping {
    #[default]
    None,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpDisplay {
    #[default]
    LowercaseE,
    UppercaseE,
    /// `1.5×10^12` style.
    PowerOf10,
}

/// How approximate results are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalDisplay {
    #[default]
    SignificantDigits,
    Interval,
    PlusMinus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub angle_unit: AngleUnit,
    pub unknowns_enabled: bool,
    /// Accept `,` as decimal separator and `;` as argument separator.
    pub decimal_comma: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { angle_unit: AngleUnit::Radians, unknowns_enabled: false, decimal_comma: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOptions {
    /// Output base for integer results: 2, 8, 10 or 16.
    pub base: u32,
    pub base_display: BaseDisplay,
    pub digit_grouping: DigitGrouping,
    pub exp_display: ExpDisplay,
    pub interval_display: IntervalDisplay,
    pub use_unicode_signs: bool,
    /// Mark exact results whose decimal expansion repeats, e.g. `0.333…`.
    pub indicate_infinite_series: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            base: 10,
            base_display: BaseDisplay::None,
            digit_grouping: DigitGrouping::None,
            exp_display: ExpDisplay::LowercaseE,
            interval_display: IntervalDisplay::SignificantDigits,
            use_unicode_signs: false,
            indicate_infinite_series: true,
        }
    }
}

/// Everything the engine needs to know about how to read and print one
/// expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub parse: ParseOptions,
    pub print: PrintOptions,
}

impl EvaluationOptions {
    /// Applies a textual option command such as `angle 2` or `unicode on`.
    ///
    /// On error the options are left untouched.
    pub fn set_option(&mut self, command: &str) -> Result<()> {
        let command = command.trim().to_ascii_lowercase();
        let (name, value) = command
            .rsplit_once(char::is_whitespace)
            .map(|(n, v)| (n.trim(), v.trim()))
            .ok_or_else(|| CalcError::InvalidOption(command.clone()))?;
        let invalid = || CalcError::InvalidOption(command.clone());

        match name {
            "angle" => {
                self.parse.angle_unit = match value {
                    "0" | "none" => AngleUnit::None,
                    "1" | "rad" | "radians" => AngleUnit::Radians,
                    "2" | "deg" | "degrees" => AngleUnit::Degrees,
                    "3" | "gra" | "gradians" => AngleUnit::Gradians,
                    _ => return Err(invalid()),
                }
            }
            "unknowns" => self.parse.unknowns_enabled = parse_switch(value).ok_or_else(invalid)?,
            "decimal comma" => self.parse.decimal_comma = parse_switch(value).ok_or_else(invalid)?,
            "unicode" => self.print.use_unicode_signs = parse_switch(value).ok_or_else(invalid)?,
            "infinite series" => self.print.indicate_infinite_series = parse_switch(value).ok_or_else(invalid)?,
            "digits" | "digit grouping" => {
                self.print.digit_grouping = if parse_switch(value).ok_or_else(invalid)? {
                    DigitGrouping::Standard
                } else {
                    DigitGrouping::None
                }
            }
            "base" => {
                self.print.base = match value {
                    "2" | "8" | "10" | "16" => value.parse().map_err(|_| invalid())?,
                    "bin" => 2,
                    "oct" => 8,
                    "dec" => 10,
                    "hex" => 16,
                    _ => return Err(invalid()),
                }
            }
            "base display" => {
                self.print.base_display = match value {
                    "none" | "off" => BaseDisplay::None,
                    "normal" | "on" => BaseDisplay::Normal,
                    _ => return Err(invalid()),
                }
            }
            "exp mode" => {
                self.print.exp_display = match value {
                    "lowercase" | "e" => ExpDisplay::LowercaseE,
                    "uppercase" => ExpDisplay::UppercaseE,
                    "none" | "power" => ExpDisplay::PowerOf10,
                    _ => return Err(invalid()),
                }
            }
            "interval display" => {
                self.print.interval_display = match value {
                    "significant" => IntervalDisplay::SignificantDigits,
                    "interval" => IntervalDisplay::Interval,
                    "plusminus" => IntervalDisplay::PlusMinus,
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Per-call toggles passed to `calculate`. Each set bit switches one named
/// option on; unknown bits are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionFlags(pub u32);

impl OptionFlags {
    pub const NONE: OptionFlags = OptionFlags(0);
    pub const UNICODE: OptionFlags = OptionFlags(1 << 0);
    pub const DEGREES: OptionFlags = OptionFlags(1 << 1);
    pub const UNKNOWNS: OptionFlags = OptionFlags(1 << 2);
    pub const DIGIT_GROUPING: OptionFlags = OptionFlags(1 << 3);
    pub const UPPERCASE_EXP: OptionFlags = OptionFlags(1 << 4);
    pub const INTERVAL_PLUSMINUS: OptionFlags = OptionFlags(1 << 5);

    pub fn contains(self, other: OptionFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Writes the selected toggles into `options`. They stay set afterwards.
    pub fn apply(self, options: &mut EvaluationOptions) {
        if self.contains(Self::UNICODE) {
            options.print.use_unicode_signs = true;
        }
        if self.contains(Self::DEGREES) {
            options.parse.angle_unit = AngleUnit::Degrees;
        }
        if self.contains(Self::UNKNOWNS) {
            options.parse.unknowns_enabled = true;
        }
        if self.contains(Self::DIGIT_GROUPING) {
            options.print.digit_grouping = DigitGrouping::Standard;
        }
        if self.contains(Self::UPPERCASE_EXP) {
            options.print.exp_display = ExpDisplay::UppercaseE;
        }
        if self.contains(Self::INTERVAL_PLUSMINUS) {
            options.print.interval_display = IntervalDisplay::PlusMinus;
        }
    }
}

impl std::ops::BitOr for OptionFlags {
    type Output = OptionFlags;

    fn bitor(self, rhs: OptionFlags) -> OptionFlags {
        OptionFlags(self.0 | rhs.0)
    }
}

impl From<u32> for OptionFlags {
    fn from(bits: u32) -> Self {
        OptionFlags(bits)
    }
}
