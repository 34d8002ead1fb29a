use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt::Write as _;

/// A JSON number plus whether its source literal was integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    value: f64,
    integral: bool,
}

impl Number {
    /// A number read from a literal with no fraction or exponent.
    pub fn integral(value: f64) -> Self {
        Self {
            value,
            integral: true,
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            value,
            integral: false,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.value
    }

    pub fn is_integral(&self) -> bool {
        self.integral
    }

    pub fn to_canonical(&self) -> String {
        if self.integral {
            format_exact(self.value)
        } else {
            format_number(self.value)
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::float(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::integral(value as f64)
    }
}

/// Parsed JSON data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Member lookup; only objects have keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Element lookup; only arrays have indices.
    pub fn index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// One step of path resolution: object key, or decimal array index.
    pub fn get_segment(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Text substituted for a scalar; containers have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => Some(Cow::Borrowed("")),
            Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Value::Number(n) => Some(Cow::Owned(n.to_canonical())),
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Compact JSON text; object members keep insertion order.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&n.to_canonical()),
            Value::String(s) => write_json_string(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_json_string(key, out);
                    out.push(':');
                    item.write_json(out);
                }
                out.push('}');
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::float(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Significant digits kept when rendering a computed number.
const SIGNIFICANT_DIGITS: usize = 15;

/// Canonical rendering of a computed number: rounded to 15 significant
/// digits, then the shortest text that reads back as that double.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
        .parse::<f64>()
        .unwrap_or(value);
    format_exact(rounded)
}

fn format_exact(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(pairs: &[(&str, Value)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn get_only_on_objects() {
        let obj = object(&[("a", Value::from(1i64))]);
        assert_eq!(obj.get("a"), Some(&Value::from(1i64)));
        assert_eq!(obj.get("b"), None);
        assert_eq!(Value::from("a").get("a"), None);
        assert_eq!(obj.index(0), None);
    }

    #[test]
    fn segment_indexes_arrays_by_decimal_text() {
        let arr = Value::Array(vec![Value::from("x"), Value::from("y")]);
        assert_eq!(arr.get_segment("1"), Some(&Value::from("y")));
        assert_eq!(arr.get_segment("2"), None);
        assert_eq!(arr.get_segment("one"), None);
        assert_eq!(arr.get_segment("-1"), None);
    }

    #[test]
    fn canonical_numbers() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(13.5), "13.5");
        assert_eq!(format_number(27.0), "27");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.0 / 3.0), "0.333333333333333");
        assert_eq!(format_number(f64::NAN), "");
        assert_eq!(Number::integral(9007199254740993.0).to_canonical(), "9007199254740992");
    }

    #[test]
    fn scalar_text() {
        assert_eq!(Value::Null.as_text().as_deref(), Some(""));
        assert_eq!(Value::Bool(true).as_text().as_deref(), Some("true"));
        assert_eq!(Value::from(2.5).as_text().as_deref(), Some("2.5"));
        assert!(Value::Array(vec![]).as_text().is_none());
    }

    #[test]
    fn json_export_keeps_order_and_escapes() {
        let doc = object(&[
            ("z", Value::from("a\"b\n")),
            ("a", Value::Array(vec![Value::from(1i64), Value::Null, Value::Bool(false)])),
        ]);
        assert_eq!(doc.to_json(), r#"{"z":"a\"b\n","a":[1,null,false]}"#);
    }
}
