//! Typed attribute values that remember how they were written.
//!
//! `xsd:double` and `xsd:boolean` have several spellings for one value
//! (`1.0` and `1`, `true` and `1`). A [`Lexical`] keeps the spelling it was
//! read from, so writing a parsed document reproduces its attributes.

use std::fmt;

use super::parse::parse_boolean;

/// A scalar schema type with a lexical space wider than its `Display`.
pub trait LexicalValue: Sized + PartialEq + fmt::Display {
    /// Schema type name used in error messages.
    const EXPECTED: &'static str;

    fn parse_lexical(raw: &str) -> Option<Self>;
}

impl LexicalValue for f64 {
    const EXPECTED: &'static str = "double";

    fn parse_lexical(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl LexicalValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn parse_lexical(raw: &str) -> Option<Self> {
        parse_boolean(raw)
    }
}

/// A typed value plus the text it was parsed from.
///
/// Equality compares values only: `Lexical::parse("1.0")` equals
/// `Lexical::from(1.0)`.
#[derive(Clone, Debug)]
pub struct Lexical<T> {
    value: T,
    text: String,
}

impl<T: LexicalValue> Lexical<T> {
    /// Parses `raw`, keeping it verbatim for output.
    pub fn parse(raw: &str) -> Option<Self> {
        T::parse_lexical(raw).map(|value| Self {
            value,
            text: raw.to_string(),
        })
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// The text written back on output.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl<T: LexicalValue> From<T> for Lexical<T> {
    fn from(value: T) -> Self {
        let text = value.to_string();
        Self { value, text }
    }
}

impl<T: PartialEq> PartialEq for Lexical<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq<f64> for Lexical<f64> {
    fn eq(&self, other: &f64) -> bool {
        self.value == *other
    }
}

impl PartialEq<bool> for Lexical<bool> {
    fn eq(&self, other: &bool) -> bool {
        self.value == *other
    }
}

impl<T> fmt::Display for Lexical<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
