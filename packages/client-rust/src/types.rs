//! Attribute model of the wide-column backing store.
//!
//! Raw items are schemaless maps from attribute name to [`AttributeValue`].
//! Only the primary key attributes are fixed by the table definition; every
//! other attribute is free-form.

use std::cmp::Ordering;
use std::collections::HashMap;

/// A raw stored item: attribute name to typed value.
pub type Item = HashMap<String, AttributeValue>;

/// Typed attribute value as carried on the wire.
///
/// Numbers travel as decimal strings (`N`) so that no precision is lost
/// between the client and the store.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// UTF-8 string.
    S(String),
    /// Number, encoded as a decimal string.
    N(String),
    /// Binary blob.
    B(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// Explicit null marker.
    Null(bool),
    /// Ordered list of values.
    L(Vec<AttributeValue>),
    /// Nested map of values.
    M(HashMap<String, AttributeValue>),
    /// String set.
    Ss(Vec<String>),
    /// Number set.
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<Vec<u8>>),
}

impl AttributeValue {
    /// Builds a string attribute.
    #[must_use]
    pub fn s(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Builds a number attribute from an integer.
    #[must_use]
    pub fn number(value: i64) -> Self {
        Self::N(value.to_string())
    }

    /// Returns the string payload of an `S` attribute.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the decimal payload of an `N` attribute.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Parses an `N` attribute as a signed 64-bit integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_n().and_then(|n| n.trim().parse().ok())
    }

    /// Returns the byte payload of a `B` attribute.
    #[must_use]
    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    /// Wire type descriptor (`"S"`, `"N"`, `"B"`, ...).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
        }
    }

    /// Orders two scalar values of the same type the way the store does.
    ///
    /// Strings and binaries compare bytewise, numbers compare numerically.
    /// Returns `None` for mismatched or non-scalar types.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::S(a), Self::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::B(a), Self::B(b)) => Some(a.cmp(b)),
            (Self::N(a), Self::N(b)) => compare_numbers(a, b),
            (Self::Bool(a), Self::Bool(b)) if a == b => Some(Ordering::Equal),
            (Self::Null(_), Self::Null(_)) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Compares two decimal strings, exactly for integers and via `f64` otherwise.
fn compare_numbers(a: &str, b: &str) -> Option<Ordering> {
    if let (Ok(a), Ok(b)) = (a.trim().parse::<i128>(), b.trim().parse::<i128>()) {
        return Some(a.cmp(&b));
    }
    let a: f64 = a.trim().parse().ok()?;
    let b: f64 = b.trim().parse().ok()?;
    a.partial_cmp(&b)
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::number(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::B(value)
    }
}

/// Returns a copy of `item` restricted to the named attributes.
///
/// Attributes absent from `item` are skipped.
#[must_use]
pub fn project(item: &Item, attributes: &[String]) -> Item {
    attributes
        .iter()
        .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}
