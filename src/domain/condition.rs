//! Subscription condition DSL.
//!
//! Two forms are understood:
//! - `temp <op> <number>` with `<op>` one of `<`, `<=`, `>`, `>=`, `==`, `=`, `!=`
//!   and a signed decimal threshold (`-3`, `+2`, `10.5`);
//! - the keyword `rain` (any case), true when the snapshot label is "rain" (any case).
//!
//! Temperature equality is exact `f64` equality, no epsilon. `temp == 5` only
//! fires when the source reports exactly 5.0.

use crate::domain::{DomainError, WeatherSnapshot};
use std::fmt;

const TEMP_KEYWORD: &str = "temp";
const RAIN_KEYWORD: &str = "rain";

/// Comparison operator of a temperature condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Ordered so two-character operators win over their one-character prefixes.
    const TOKENS: [(&'static str, CompareOp); 7] = [
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
        ("=", CompareOp::Eq),
    ];

    /// Split a leading operator off `input`. Returns the operator and the remainder.
    fn lex(input: &str) -> Option<(Self, &str)> {
        Self::TOKENS
            .iter()
            .find_map(|&(token, op)| input.strip_prefix(token).map(|rest| (op, rest)))
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed subscription condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Temperature { op: CompareOp, threshold: f64 },
    Rain,
}

impl Condition {
    /// Parse condition text. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let text = input.trim();
        if let Some(condition) = Self::parse_temperature(text)? {
            return Ok(condition);
        }
        if text.eq_ignore_ascii_case(RAIN_KEYWORD) {
            return Ok(Self::Rain);
        }
        Err(DomainError::UnknownCondition(text.to_string()))
    }

    /// `Ok(None)` when `text` is not a `temp <op> ...` expression at all.
    fn parse_temperature(text: &str) -> Result<Option<Self>, DomainError> {
        let Some(rest) = text.strip_prefix(TEMP_KEYWORD) else {
            return Ok(None);
        };
        let Some((op, literal)) = CompareOp::lex(rest.trim_start()) else {
            return Ok(None);
        };
        let literal = literal.trim_start();
        let malformed = || DomainError::MalformedThreshold {
            condition: text.to_string(),
            literal: literal.to_string(),
        };
        if !is_signed_decimal(literal) {
            return Err(malformed());
        }
        let threshold = literal.parse::<f64>().map_err(|_| malformed())?;
        Ok(Some(Self::Temperature { op, threshold }))
    }

    /// Whether `weather` satisfies this condition.
    pub fn matches(&self, weather: &WeatherSnapshot) -> bool {
        match *self {
            Self::Temperature { op, threshold } => op.apply(weather.temperature, threshold),
            Self::Rain => weather.condition.eq_ignore_ascii_case(RAIN_KEYWORD),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature { op, threshold } => write!(f, "{} {} {}", TEMP_KEYWORD, op, threshold),
            Self::Rain => f.write_str(RAIN_KEYWORD),
        }
    }
}

/// Parse `condition` and evaluate it against `weather`.
pub fn evaluate(condition: &str, weather: &WeatherSnapshot) -> Result<bool, DomainError> {
    Condition::parse(condition).map(|c| c.matches(weather))
}

/// Check that `condition` is well-formed without evaluating it.
pub fn validate_condition(condition: &str) -> Result<(), DomainError> {
    Condition::parse(condition).map(|_| ())
}

/// `[+-]?digits(.digits)?`
fn is_signed_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match unsigned.split_once('.') {
        Some((int, frac)) => digits(int) && digits(frac),
        None => digits(unsigned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn weather(temperature: f64, condition: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            city: "Kyiv".into(),
            temperature,
            humidity: 50,
            condition: condition.into(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_less_than() {
        assert!(evaluate("temp < 10", &weather(5.0, "Sunny")).unwrap());
        assert!(!evaluate("temp < 10", &weather(15.0, "Sunny")).unwrap());
    }

    #[test]
    fn test_inclusive_boundaries() {
        assert!(evaluate("temp >= 5", &weather(5.0, "Sunny")).unwrap());
        assert!(evaluate("temp <= 5", &weather(5.0, "Sunny")).unwrap());
        assert!(!evaluate("temp > 5", &weather(5.0, "Sunny")).unwrap());
        assert!(!evaluate("temp < 5", &weather(5.0, "Sunny")).unwrap());
    }

    #[test]
    fn test_equality_forms_are_exact() {
        assert!(evaluate("temp == 5", &weather(5.0, "Sunny")).unwrap());
        assert!(evaluate("temp = 5", &weather(5.0, "Sunny")).unwrap());
        assert!(!evaluate("temp == 5", &weather(5.000001, "Sunny")).unwrap());
        assert!(evaluate("temp != 5", &weather(6.0, "Sunny")).unwrap());
        assert!(!evaluate("temp != 5", &weather(5.0, "Sunny")).unwrap());
    }

    #[test]
    fn test_whitespace_and_signs() {
        assert!(evaluate("  temp<10  ", &weather(5.0, "")).unwrap());
        assert_eq!(
            Condition::parse("temp <= -3.5").unwrap(),
            Condition::Temperature {
                op: CompareOp::Le,
                threshold: -3.5
            }
        );
        assert_eq!(
            Condition::parse("temp>+2").unwrap(),
            Condition::Temperature {
                op: CompareOp::Gt,
                threshold: 2.0
            }
        );
        assert!(evaluate("temp > -1", &weather(-0.5, "")).unwrap());
    }

    #[test]
    fn test_rain_is_case_insensitive_on_both_sides() {
        assert!(evaluate("rain", &weather(20.0, "Rain")).unwrap());
        assert!(evaluate("RAIN", &weather(20.0, "rain")).unwrap());
        assert!(!evaluate("rain", &weather(20.0, "Clear")).unwrap());
        assert!(!evaluate("rain", &weather(20.0, "Heavy Rain")).unwrap());
    }

    #[test]
    fn test_malformed_threshold() {
        for input in ["temp < abc", "temp <", "temp < 1e5", "temp < inf", "temp < 5.", "temp = = 5"] {
            let err = evaluate(input, &weather(5.0, "")).unwrap_err();
            assert!(
                matches!(err, DomainError::MalformedThreshold { .. }),
                "{input}: {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_condition() {
        for input in ["snow", "", "temp", "temperature < 5", "condition=snow", "temp ~ 5"] {
            let err = evaluate(input, &weather(5.0, "Snow")).unwrap_err();
            assert!(matches!(err, DomainError::UnknownCondition(_)), "{input}: {err:?}");
        }
        match evaluate(" snow ", &weather(0.0, "")) {
            Err(DomainError::UnknownCondition(text)) => assert_eq!(text, "snow"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Condition::parse("temp=5").unwrap().to_string(), "temp == 5");
        assert_eq!(Condition::parse("temp<=-3.5").unwrap().to_string(), "temp <= -3.5");
        assert_eq!(Condition::parse("Rain").unwrap().to_string(), "rain");
    }

    #[test]
    fn test_validate_condition() {
        assert!(validate_condition("temp > 0").is_ok());
        assert!(validate_condition("rain").is_ok());
        assert!(validate_condition("fog").is_err());
    }

    #[test]
    fn test_evaluate_is_deterministic_across_threads() {
        let snapshot = weather(7.5, "Rain");
        let inputs = ["temp < 10", "temp >= 7.5", "temp != 7.5", "rain"];
        let expected: Vec<bool> = inputs
            .iter()
            .map(|c| evaluate(c, &snapshot).unwrap())
            .collect();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let got: Vec<bool> = inputs
                            .iter()
                            .map(|c| evaluate(c, &snapshot).unwrap())
                            .collect();
                        assert_eq!(got, expected);
                    }
                });
            }
        });
        assert_eq!(expected, vec![true, true, false, true]);
    }
}
