//! Field-by-field checks over raw JSON bodies.
//!
//! Every getter records a [`FieldError`] instead of failing fast, so one
//! response can list every bad field. Required getters return a placeholder
//! on failure; callers must call [`Fields::finish`] before trusting values.

use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult, FieldError};

/// Largest amount accepted, matching `DECIMAL(14, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
    NonNegative,
    Positive,
}

pub struct Fields<'a> {
    obj: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    pub fn new(body: &'a Value) -> AppResult<Self> {
        match body.as_object() {
            Some(obj) => Ok(Self {
                obj,
                errors: Vec::new(),
            }),
            None => Err(AppError::Validation(vec![FieldError::new(
                "body",
                "must be a JSON object",
            )])),
        }
    }

    /// Present and not null. Empty strings count as absent for numbers.
    fn value(&self, name: &str) -> Option<&'a Value> {
        match self.obj.get(name) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn numeric_value(&self, name: &str) -> Option<&'a Value> {
        self.value(name)
            .filter(|v| !matches!(v, Value::String(s) if s.trim().is_empty()))
    }

    fn fail(&mut self, name: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(name, message));
    }

    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.obj.contains_key(*n))
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.obj.contains_key(name)
    }

    pub fn required_str(&mut self, name: &str) -> String {
        match self.optional_str(name) {
            Some(s) => s,
            None => {
                if !self.errors.iter().any(|e| e.field == name) {
                    self.fail(name, "is required");
                }
                String::new()
            }
        }
    }

    /// Trimmed non-empty string, or `None` when absent.
    pub fn optional_str(&mut self, name: &str) -> Option<String> {
        match self.value(name) {
            None => None,
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) => {
                self.fail(name, "must not be empty");
                None
            }
            Some(_) => {
                self.fail(name, "must be a string");
                None
            }
        }
    }

    /// `None` = absent, `Some(None)` = explicit null or empty string (clear).
    pub fn nullable_str(&mut self, name: &str) -> Option<Option<String>> {
        match self.obj.get(name) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(s)) if s.trim().is_empty() => Some(None),
            Some(Value::String(s)) => Some(Some(s.trim().to_string())),
            Some(_) => {
                self.fail(name, "must be a string");
                None
            }
        }
    }

    pub fn required_int(&mut self, name: &str, range: RangeInclusive<i64>) -> i64 {
        let fallback = *range.start();
        match self.numeric_value(name) {
            Some(_) => self.optional_int(name, range).unwrap_or(fallback),
            None => {
                self.fail(name, "is required");
                fallback
            }
        }
    }

    pub fn optional_int(&mut self, name: &str, range: RangeInclusive<i64>) -> Option<i64> {
        let value = self.numeric_value(name)?;
        match parse_int(value) {
            Some(n) if range.contains(&n) => Some(n),
            Some(_) => {
                self.fail(
                    name,
                    format!("must be between {} and {}", range.start(), range.end()),
                );
                None
            }
            None => {
                self.fail(name, "must be an integer");
                None
            }
        }
    }

    pub fn required_amount(&mut self, name: &str, rule: AmountRule) -> Decimal {
        match self.numeric_value(name) {
            Some(_) => self.optional_amount(name, rule).unwrap_or(Decimal::ZERO),
            None => {
                self.fail(name, "is required");
                Decimal::ZERO
            }
        }
    }

    /// Absent, null and empty fall back to `default`.
    pub fn amount_or(&mut self, name: &str, rule: AmountRule, default: Decimal) -> Decimal {
        self.optional_amount(name, rule).unwrap_or(default)
    }

    pub fn optional_amount(&mut self, name: &str, rule: AmountRule) -> Option<Decimal> {
        let value = self.numeric_value(name)?;
        match check_amount(value, rule) {
            Ok(amount) => Some(amount),
            Err(message) => {
                self.fail(name, message);
                None
            }
        }
    }

    pub fn optional_bool(&mut self, name: &str) -> Option<bool> {
        match self.value(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => {
                self.fail(name, "must be a boolean");
                None
            }
        }
    }

    pub fn required_date(&mut self, name: &str) -> NaiveDate {
        match self.optional_date(name) {
            Some(d) => d,
            None => {
                if !self.errors.iter().any(|e| e.field == name) {
                    self.fail(name, "is required");
                }
                NaiveDate::default()
            }
        }
    }

    pub fn optional_date(&mut self, name: &str) -> Option<NaiveDate> {
        let value = self.value(name)?;
        match value.as_str().and_then(parse_date) {
            Some(d) => Some(d),
            None => {
                self.fail(name, "must be a date (YYYY-MM-DD)");
                None
            }
        }
    }

    pub fn required_datetime(&mut self, name: &str) -> DateTime<Utc> {
        match self.nullable_datetime(name) {
            Some(Some(dt)) => dt,
            other => {
                if other.is_some() || !self.errors.iter().any(|e| e.field == name) {
                    self.fail(name, "is required");
                }
                DateTime::<Utc>::default()
            }
        }
    }

    /// `None` = absent, `Some(None)` = explicit null.
    pub fn nullable_datetime(&mut self, name: &str) -> Option<Option<DateTime<Utc>>> {
        match self.obj.get(name)? {
            Value::Null => Some(None),
            Value::String(s) => match parse_datetime(s) {
                Some(dt) => Some(Some(dt)),
                None => {
                    self.fail(name, "must be an RFC 3339 timestamp or a date");
                    None
                }
            },
            _ => {
                self.fail(name, "must be an RFC 3339 timestamp or a date");
                None
            }
        }
    }

    /// Like `nullable_datetime`, but an explicit null is a failure.
    pub fn optional_datetime(&mut self, name: &str) -> Option<DateTime<Utc>> {
        match self.nullable_datetime(name)? {
            Some(dt) => Some(dt),
            None => {
                self.fail(name, "must not be null");
                None
            }
        }
    }

    pub fn optional_enum<T: FromStr>(&mut self, name: &str, allowed: &str) -> Option<T> {
        let value = self.value(name)?;
        match value.as_str().and_then(|s| T::from_str(s).ok()) {
            Some(v) => Some(v),
            None => {
                self.fail(name, format!("must be one of: {allowed}"));
                None
            }
        }
    }

    /// Array of non-empty strings, deduplicated in order.
    pub fn optional_str_list(&mut self, name: &str) -> Option<Vec<String>> {
        let value = self.value(name)?;
        let Some(items) = value.as_array() else {
            self.fail(name, "must be an array of strings");
            return None;
        };

        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => {
                    if !out.iter().any(|o| o == s) {
                        out.push(s.to_string());
                    }
                }
                _ => {
                    self.fail(name, "must be an array of non-empty strings");
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Adds an error that depends on more than one field.
    pub fn reject(&mut self, name: &str, message: impl Into<String>) {
        self.fail(name, message);
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// JSON integers, integral floats (`6.0`) and numeric strings (`"6"`).
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn check_amount(value: &Value, rule: AmountRule) -> Result<Decimal, String> {
    let amount = parse_decimal(value).ok_or_else(|| "must be a number".to_string())?;

    match rule {
        AmountRule::NonNegative if amount.is_sign_negative() && !amount.is_zero() => {
            return Err("must not be negative".into());
        }
        AmountRule::Positive if amount <= Decimal::ZERO => {
            return Err("must be greater than 0".into());
        }
        _ => {}
    }
    if amount.normalize().scale() > 2 {
        return Err("must have at most 2 decimal places".into());
    }
    if amount > MAX_AMOUNT {
        return Err(format!("must not exceed {}", MAX_AMOUNT));
    }
    Ok(amount.normalize())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Loose address check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn max_amount_is_twelve_nines_and_cents() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let body = json!({ "month": "6", "year": 2025.0, "basicSalary": "5000.50" });
        let mut f = Fields::new(&body).unwrap();

        assert_eq!(f.required_int("month", 1..=12), 6);
        assert_eq!(f.required_int("year", 2000..=2100), 2025);
        assert_eq!(
            f.required_amount("basicSalary", AmountRule::NonNegative),
            Decimal::from_str("5000.5").unwrap()
        );
        assert!(f.finish().is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let body = json!({ "month": 13, "year": "soon", "bonus": -1 });
        let mut f = Fields::new(&body).unwrap();
        f.required_str("employeeId");
        f.required_int("month", 1..=12);
        f.required_int("year", 2000..=2100);
        f.required_amount("basicSalary", AmountRule::NonNegative);
        f.amount_or("bonus", AmountRule::NonNegative, Decimal::ZERO);

        let fields = fields_of(f.finish().unwrap_err());
        assert_eq!(fields, vec!["employeeId", "month", "year", "basicSalary", "bonus"]);
    }

    #[test]
    fn fractional_month_is_rejected() {
        let body = json!({ "month": 6.5 });
        let mut f = Fields::new(&body).unwrap();
        f.required_int("month", 1..=12);
        assert_eq!(fields_of(f.finish().unwrap_err()), vec!["month"]);
    }

    #[test]
    fn missing_optional_amount_uses_default() {
        let body = json!({ "bonus": null, "deductions": "" });
        let mut f = Fields::new(&body).unwrap();
        assert_eq!(f.amount_or("bonus", AmountRule::NonNegative, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            f.amount_or("deductions", AmountRule::NonNegative, Decimal::ZERO),
            Decimal::ZERO
        );
        assert!(f.finish().is_ok());
    }

    #[test]
    fn amount_precision_and_ceiling_are_enforced() {
        let body = json!({ "a": 1.005, "b": "1000000000000", "c": 0 });
        let mut f = Fields::new(&body).unwrap();
        f.optional_amount("a", AmountRule::NonNegative);
        f.optional_amount("b", AmountRule::NonNegative);
        f.optional_amount("c", AmountRule::Positive);
        assert_eq!(fields_of(f.finish().unwrap_err()), vec!["a", "b", "c"]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(fields_of(Fields::new(&json!([1, 2])).err().unwrap()), vec!["body"]);
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(
            parse_date("2024-02-29T10:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_datetime("2025-01-01").is_some());
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("john.doe@company.com"));
        assert!(!is_valid_email("john.doe@company"));
        assert!(!is_valid_email("@company.com"));
        assert!(!is_valid_email("john doe@company.com"));
    }

    #[test]
    fn str_list_deduplicates() {
        let body = json!({ "teamMembers": ["u1", "u2", "u1"] });
        let mut f = Fields::new(&body).unwrap();
        assert_eq!(
            f.optional_str_list("teamMembers"),
            Some(vec!["u1".to_string(), "u2".to_string()])
        );
    }
}
