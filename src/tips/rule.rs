//! Declarative tip rules and their interpreter.
//!
//! A rule is a predicate over either a transient parameter value or the
//! donation history of an event. Rules never fail: a missing parameter is
//! simply unequal to anything and an event without donations counts zero.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

/// Value of a transient tip parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Text(_) => "text",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "\"{}\"", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Equal,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub fn holds(self, count: usize, value: usize) -> bool {
        match self {
            Comparison::Greater => count > value,
            Comparison::GreaterOrEqual => count >= value,
            Comparison::Equal => count == value,
            Comparison::Less => count < value,
            Comparison::LessOrEqual => count <= value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "==",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        }
    }
}

/// Trailing time window for donation queries.
///
/// A donation at `at` falls inside the window ending at `now` when
/// `now - window < at <= now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window(Duration);

impl Window {
    pub fn minutes(n: i64) -> Self {
        Self(Duration::minutes(n))
    }

    pub fn hours(n: i64) -> Self {
        Self(Duration::hours(n))
    }

    pub fn days(n: i64) -> Self {
        Self(Duration::days(n))
    }

    pub fn weeks(n: i64) -> Self {
        Self(Duration::weeks(n))
    }

    /// Exclusive lower bound of the window ending at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.0
    }

    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        at > self.start(now) && at <= now
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if d.num_seconds() % Duration::weeks(1).num_seconds() == 0 && d.num_weeks() > 0 {
            write!(f, "{}w", d.num_weeks())
        } else if d.num_seconds() % 86_400 == 0 && d.num_days() > 0 {
            write!(f, "{}d", d.num_days())
        } else if d.num_seconds() % 3600 == 0 && d.num_hours() > 0 {
            write!(f, "{}h", d.num_hours())
        } else {
            write!(f, "{}m", d.num_minutes())
        }
    }
}

impl FromStr for Window {
    type Err = String;

    /// Parse a window like "30m", "6h", "7d" or "2w".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let Some(unit) = s.chars().last() else {
            return Err("Empty window".to_string());
        };
        let count = &s[..s.len() - unit.len_utf8()];
        let n = count
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("Invalid window length: {}", count))?;

        match unit {
            'm' => Ok(Window::minutes(n)),
            'h' => Ok(Window::hours(n)),
            'd' => Ok(Window::days(n)),
            'w' => Ok(Window::weeks(n)),
            _ => Err(format!(
                "Invalid window: {}. Use format like '30m', '6h', '7d', '2w'",
                s
            )),
        }
    }
}

/// Read access to the state rules are evaluated against.
pub trait RuleContext {
    fn parameter(&self, name: &str) -> Option<&ParamValue>;
    /// Donation history of an event; empty when the event was never donated.
    fn donations(&self, event_id: &str) -> &[DateTime<Utc>];
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Holds when the parameter currently equals `equals`.
    Parameter { name: String, equals: ParamValue },
    /// Compares the total donation count of an event.
    EventCount {
        event: String,
        op: Comparison,
        value: usize,
    },
    /// Compares the donation count inside a trailing window.
    EventWindowedCount {
        event: String,
        within: Window,
        op: Comparison,
        value: usize,
    },
}

impl Rule {
    pub fn parameter(name: impl Into<String>, equals: impl Into<ParamValue>) -> Self {
        Rule::Parameter {
            name: name.into(),
            equals: equals.into(),
        }
    }

    pub fn event_count(event: impl Into<String>, op: Comparison, value: usize) -> Self {
        Rule::EventCount {
            event: event.into(),
            op,
            value,
        }
    }

    pub fn donated_within(
        event: impl Into<String>,
        within: Window,
        op: Comparison,
        value: usize,
    ) -> Self {
        Rule::EventWindowedCount {
            event: event.into(),
            within,
            op,
            value,
        }
    }

    pub fn evaluate(&self, ctx: &dyn RuleContext) -> bool {
        match self {
            Rule::Parameter { name, equals } => ctx.parameter(name) == Some(equals),
            Rule::EventCount { event, op, value } => op.holds(ctx.donations(event).len(), *value),
            Rule::EventWindowedCount {
                event,
                within,
                op,
                value,
            } => {
                let now = ctx.now();
                let count = ctx
                    .donations(event)
                    .iter()
                    .filter(|at| within.contains(**at, now))
                    .count();
                op.holds(count, *value)
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Parameter { name, equals } => write!(f, "{} == {}", name, equals),
            Rule::EventCount { event, op, value } => {
                write!(f, "{}.count {} {}", event, op.symbol(), value)
            }
            Rule::EventWindowedCount {
                event,
                within,
                op,
                value,
            } => write!(
                f,
                "{}.within({}).count {} {}",
                event,
                within,
                op.symbol(),
                value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedContext {
        params: HashMap<String, ParamValue>,
        donations: HashMap<String, Vec<DateTime<Utc>>>,
        now: DateTime<Utc>,
    }

    impl FixedContext {
        fn new() -> Self {
            Self {
                params: HashMap::new(),
                donations: HashMap::new(),
                now: Utc::now(),
            }
        }
    }

    impl RuleContext for FixedContext {
        fn parameter(&self, name: &str) -> Option<&ParamValue> {
            self.params.get(name)
        }

        fn donations(&self, event_id: &str) -> &[DateTime<Utc>] {
            self.donations
                .get(event_id)
                .map(|d| d.as_slice())
                .unwrap_or(&[])
        }

        fn now(&self) -> DateTime<Utc> {
            self.now
        }
    }

    #[test]
    fn test_parameter_rule() {
        let mut ctx = FixedContext::new();
        let rule = Rule::parameter("isPro", true);
        assert!(!rule.evaluate(&ctx));

        ctx.params.insert("isPro".into(), ParamValue::Bool(false));
        assert!(!rule.evaluate(&ctx));

        ctx.params.insert("isPro".into(), ParamValue::Bool(true));
        assert!(rule.evaluate(&ctx));
    }

    #[test]
    fn test_parameter_rule_type_mismatch_is_false() {
        let mut ctx = FixedContext::new();
        ctx.params.insert("isPro".into(), ParamValue::Int(1));
        assert!(!Rule::parameter("isPro", true).evaluate(&ctx));
    }

    #[test]
    fn test_event_count_without_donations_is_zero() {
        let ctx = FixedContext::new();
        assert!(!Rule::event_count("itemAdded", Comparison::Greater, 0).evaluate(&ctx));
        assert!(Rule::event_count("itemAdded", Comparison::Equal, 0).evaluate(&ctx));
    }

    #[test]
    fn test_event_count_threshold() {
        let mut ctx = FixedContext::new();
        let rule = Rule::event_count("itemAdded", Comparison::Greater, 2);

        for _ in 0..2 {
            ctx.donations
                .entry("itemAdded".into())
                .or_default()
                .push(ctx.now);
            assert!(!rule.evaluate(&ctx));
        }

        ctx.donations
            .entry("itemAdded".into())
            .or_default()
            .push(ctx.now);
        assert!(rule.evaluate(&ctx));
    }

    #[test]
    fn test_windowed_rule_boundaries() {
        let mut ctx = FixedContext::new();
        let now = ctx.now;
        let rule = Rule::donated_within("itemAdded", Window::days(7), Comparison::Greater, 0);

        ctx.donations
            .insert("itemAdded".into(), vec![now - Duration::days(8)]);
        assert!(!rule.evaluate(&ctx));

        // Exactly at the lower bound is outside
        ctx.donations
            .insert("itemAdded".into(), vec![now - Duration::days(7)]);
        assert!(!rule.evaluate(&ctx));

        ctx.donations
            .insert("itemAdded".into(), vec![now - Duration::hours(1)]);
        assert!(rule.evaluate(&ctx));

        // The upper bound is inclusive
        ctx.donations.insert("itemAdded".into(), vec![now]);
        assert!(rule.evaluate(&ctx));

        ctx.donations
            .insert("itemAdded".into(), vec![now + Duration::seconds(1)]);
        assert!(!rule.evaluate(&ctx));
    }

    #[test]
    fn test_comparisons() {
        assert!(Comparison::GreaterOrEqual.holds(3, 3));
        assert!(Comparison::Less.holds(2, 3));
        assert!(Comparison::LessOrEqual.holds(3, 3));
        assert!(!Comparison::Equal.holds(2, 3));
    }

    #[test]
    fn test_parse_window() {
        assert_eq!("30m".parse::<Window>().unwrap(), Window::minutes(30));
        assert_eq!("6h".parse::<Window>().unwrap(), Window::hours(6));
        assert_eq!("7D".parse::<Window>().unwrap(), Window::days(7));
        assert_eq!(" 2w ".parse::<Window>().unwrap(), Window::weeks(2));
        assert!("0d".parse::<Window>().is_err());
        assert!("-1h".parse::<Window>().is_err());
        assert!("3600".parse::<Window>().is_err());
        assert!("week".parse::<Window>().is_err());
    }

    #[test]
    fn test_window_display_uses_largest_unit() {
        assert_eq!(Window::days(14).to_string(), "2w");
        assert_eq!(Window::hours(48).to_string(), "2d");
        assert_eq!(Window::minutes(90).to_string(), "90m");
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(Rule::parameter("isPro", true).to_string(), "isPro == true");
        assert_eq!(
            Rule::donated_within("itemAdded", Window::weeks(1), Comparison::Greater, 2)
                .to_string(),
            "itemAdded.within(1w).count > 2"
        );
        assert_eq!(
            Rule::event_count("itemDeleted", Comparison::Greater, 0).to_string(),
            "itemDeleted.count > 0"
        );
    }
}
