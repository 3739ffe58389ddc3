//! Typed condition, key-condition, update, and projection expressions.
//!
//! Requests carry expressions as small ASTs instead of strings. Backends
//! either evaluate them directly ([`Condition::evaluate`], [`Update::apply`])
//! or render them to the store's expression syntax through an
//! [`ExpressionContext`], which allocates the `#n`/`:v` placeholders.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{AttributeValue, Item};

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// Operator as written in an expression string.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Predicate evaluated against a single item.
///
/// Used as a filter (reads) or as a condition (writes). Attribute names are
/// top-level attributes; nested document paths are not supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        attribute: String,
        op: Comparator,
        value: AttributeValue,
    },
    Between {
        attribute: String,
        low: AttributeValue,
        high: AttributeValue,
    },
    BeginsWith {
        attribute: String,
        prefix: AttributeValue,
    },
    AttributeExists(String),
    AttributeNotExists(String),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    #[must_use]
    pub fn compare(attribute: impl Into<String>, op: Comparator, value: AttributeValue) -> Self {
        Self::Compare {
            attribute: attribute.into(),
            op,
            value,
        }
    }

    #[must_use]
    pub fn equals(attribute: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(attribute, Comparator::Eq, value)
    }

    #[must_use]
    pub fn gt(attribute: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(attribute, Comparator::Gt, value)
    }

    #[must_use]
    pub fn le(attribute: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(attribute, Comparator::Le, value)
    }

    #[must_use]
    pub fn exists(attribute: impl Into<String>) -> Self {
        Self::AttributeExists(attribute.into())
    }

    #[must_use]
    pub fn not_exists(attribute: impl Into<String>) -> Self {
        Self::AttributeNotExists(attribute.into())
    }

    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the predicate against `item`.
    ///
    /// A comparison against a missing attribute or a value of another type
    /// is false, except `<>` which is true.
    #[must_use]
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
            } => match item.get(attribute).and_then(|current| current.compare(value)) {
                Some(ordering) => op.accepts(ordering),
                None => *op == Comparator::Ne,
            },
            Self::Between {
                attribute,
                low,
                high,
            } => item.get(attribute).is_some_and(|current| {
                current.compare(low).is_some_and(|o| o != Ordering::Less)
                    && current.compare(high).is_some_and(|o| o != Ordering::Greater)
            }),
            Self::BeginsWith { attribute, prefix } => {
                match (item.get(attribute), prefix) {
                    (Some(AttributeValue::S(s)), AttributeValue::S(p)) => s.starts_with(p.as_str()),
                    (Some(AttributeValue::B(b)), AttributeValue::B(p)) => b.starts_with(p),
                    _ => false,
                }
            }
            Self::AttributeExists(attribute) => item.contains_key(attribute),
            Self::AttributeNotExists(attribute) => !item.contains_key(attribute),
            Self::And(left, right) => left.evaluate(item) && right.evaluate(item),
            Self::Or(left, right) => left.evaluate(item) || right.evaluate(item),
            Self::Not(inner) => !inner.evaluate(item),
        }
    }

    /// Renders the predicate to expression syntax, registering placeholders in `ctx`.
    pub fn render(&self, ctx: &mut ExpressionContext) -> String {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
            } => format!(
                "{} {} {}",
                ctx.name(attribute),
                op.symbol(),
                ctx.value(value.clone())
            ),
            Self::Between {
                attribute,
                low,
                high,
            } => format!(
                "{} BETWEEN {} AND {}",
                ctx.name(attribute),
                ctx.value(low.clone()),
                ctx.value(high.clone())
            ),
            Self::BeginsWith { attribute, prefix } => format!(
                "begins_with({}, {})",
                ctx.name(attribute),
                ctx.value(prefix.clone())
            ),
            Self::AttributeExists(attribute) => format!("attribute_exists({})", ctx.name(attribute)),
            Self::AttributeNotExists(attribute) => {
                format!("attribute_not_exists({})", ctx.name(attribute))
            }
            Self::And(left, right) => format!("({}) AND ({})", left.render(ctx), right.render(ctx)),
            Self::Or(left, right) => format!("({}) OR ({})", left.render(ctx), right.render(ctx)),
            Self::Not(inner) => format!("NOT ({})", inner.render(ctx)),
        }
    }
}

/// Predicate allowed on the sort key of a key condition.
#[derive(Debug, Clone, PartialEq)]
pub enum SortPredicate {
    /// Any comparator except `<>`.
    Compare(Comparator, AttributeValue),
    Between(AttributeValue, AttributeValue),
    BeginsWith(AttributeValue),
}

/// Key condition of a query: partition-key equality plus an optional
/// sort-key predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub partition_key: String,
    pub partition_value: AttributeValue,
    pub sort_key: Option<(String, SortPredicate)>,
}

impl KeyCondition {
    /// Selects every item of one partition.
    #[must_use]
    pub fn partition(attribute: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            partition_key: attribute.into(),
            partition_value: value,
            sort_key: None,
        }
    }

    /// Narrows the partition with a sort-key predicate.
    #[must_use]
    pub fn with_sort(mut self, attribute: impl Into<String>, predicate: SortPredicate) -> Self {
        self.sort_key = Some((attribute.into(), predicate));
        self
    }

    /// Equivalent general predicate, used by backends that evaluate directly.
    #[must_use]
    pub fn to_condition(&self) -> Condition {
        let partition = Condition::equals(self.partition_key.clone(), self.partition_value.clone());
        match &self.sort_key {
            None => partition,
            Some((attribute, predicate)) => {
                let sort = match predicate {
                    SortPredicate::Compare(op, value) => {
                        Condition::compare(attribute.clone(), *op, value.clone())
                    }
                    SortPredicate::Between(low, high) => Condition::Between {
                        attribute: attribute.clone(),
                        low: low.clone(),
                        high: high.clone(),
                    },
                    SortPredicate::BeginsWith(prefix) => Condition::BeginsWith {
                        attribute: attribute.clone(),
                        prefix: prefix.clone(),
                    },
                };
                partition.and(sort)
            }
        }
    }

    /// Renders as `#pk = :v AND <sort predicate>`.
    pub fn render(&self, ctx: &mut ExpressionContext) -> String {
        let mut out = format!(
            "{} = {}",
            ctx.name(&self.partition_key),
            ctx.value(self.partition_value.clone())
        );
        if let Some((attribute, predicate)) = &self.sort_key {
            let name = ctx.name(attribute);
            let sort = match predicate {
                SortPredicate::Compare(op, value) => {
                    format!("{name} {} {}", op.symbol(), ctx.value(value.clone()))
                }
                SortPredicate::Between(low, high) => format!(
                    "{name} BETWEEN {} AND {}",
                    ctx.value(low.clone()),
                    ctx.value(high.clone())
                ),
                SortPredicate::BeginsWith(prefix) => {
                    format!("begins_with({name}, {})", ctx.value(prefix.clone()))
                }
            };
            out.push_str(" AND ");
            out.push_str(&sort);
        }
        out
    }
}

/// Update expression: `SET` assignments followed by `REMOVE`s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Vec<(String, AttributeValue)>,
    pub remove: Vec<String>,
}

impl Update {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, attribute: impl Into<String>, value: AttributeValue) -> Self {
        self.set.push((attribute.into(), value));
        self
    }

    #[must_use]
    pub fn remove(mut self, attribute: impl Into<String>) -> Self {
        self.remove.push(attribute.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Names of every attribute the update touches.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.set
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.remove.iter().map(String::as_str))
    }

    /// Applies the update to `item` in place.
    pub fn apply(&self, item: &mut Item) {
        for (name, value) in &self.set {
            item.insert(name.clone(), value.clone());
        }
        for name in &self.remove {
            item.remove(name);
        }
    }

    /// Renders as `SET #a = :v, ... REMOVE #b, ...`.
    pub fn render(&self, ctx: &mut ExpressionContext) -> String {
        let mut clauses = Vec::with_capacity(2);
        if !self.set.is_empty() {
            let assignments: Vec<String> = self
                .set
                .iter()
                .map(|(name, value)| format!("{} = {}", ctx.name(name), ctx.value(value.clone())))
                .collect();
            clauses.push(format!("SET {}", assignments.join(", ")));
        }
        if !self.remove.is_empty() {
            let names: Vec<String> = self.remove.iter().map(|name| ctx.name(name)).collect();
            clauses.push(format!("REMOVE {}", names.join(", ")));
        }
        clauses.join(" ")
    }
}

/// Renders a projection list as `#a, #b`.
pub fn render_projection(attributes: &[String], ctx: &mut ExpressionContext) -> String {
    attributes
        .iter()
        .map(|name| ctx.name(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Placeholder allocator shared by all expressions of one request.
///
/// Every attribute name is aliased (`#n0`, `#n1`, ...) so reserved words
/// such as `name` and `value` never need special handling. Each value gets
/// its own `:vN` placeholder.
#[derive(Debug, Default)]
pub struct ExpressionContext {
    placeholders: HashMap<String, String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl ExpressionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the placeholder for `attribute`, allocating it on first use.
    pub fn name(&mut self, attribute: &str) -> String {
        if let Some(existing) = self.placeholders.get(attribute) {
            return existing.clone();
        }
        let placeholder = format!("#n{}", self.placeholders.len());
        self.placeholders
            .insert(attribute.to_string(), placeholder.clone());
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    /// Allocates a fresh placeholder for `value`.
    pub fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    /// Placeholder maps, `None` when empty (the store rejects empty maps).
    #[must_use]
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}
