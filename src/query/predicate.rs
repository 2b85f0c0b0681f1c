//! Filter predicates evaluated against items.

use crate::types::{Item, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison operator for [`Predicate::Compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A filter over items.
///
/// Absent fields evaluate as `Null`. Ordered comparisons (`Lt`, `Le`, `Gt`, `Ge`)
/// are false whenever either side is `Null` or the two values are of different kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches everything.
    True,

    Compare {
        key: String,
        op: Comparison,
        value: Value,
    },

    IsNull {
        key: String,
    },

    And(Vec<Predicate>),

    Or(Vec<Predicate>),

    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(key: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Eq, value)
    }

    pub fn not_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Ne, value)
    }

    pub fn less_than(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Lt, value)
    }

    pub fn at_most(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Le, value)
    }

    pub fn greater_than(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Gt, value)
    }

    pub fn at_least(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, Comparison::Ge, value)
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Predicate::IsNull { key: key.into() }
    }

    /// AND-compose with another predicate, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            Predicate::True => return other,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            Predicate::True => {}
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    pub fn or(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::Or(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::Or(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::Or(parts)
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluate the predicate against an item.
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Compare { key, op, value } => compare_values(item.value(key), *op, value),
            Predicate::IsNull { key } => item.value(key).is_null(),
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(item)),
            Predicate::Or(parts) => parts.iter().any(|p| p.evaluate(item)),
            Predicate::Not(inner) => !inner.evaluate(item),
        }
    }
}

fn compare_values(left: &Value, op: Comparison, right: &Value) -> bool {
    match op {
        Comparison::Eq => left == right,
        Comparison::Ne => left != right,
        _ => {
            if left.is_null() || right.is_null() || left.rank() != right.rank() {
                return false;
            }
            let ordering = left.total_cmp(right);
            match op {
                Comparison::Lt => ordering == Ordering::Less,
                Comparison::Le => ordering != Ordering::Greater,
                Comparison::Gt => ordering == Ordering::Greater,
                Comparison::Ge => ordering != Ordering::Less,
                Comparison::Eq | Comparison::Ne => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    fn person(name: &str, age: i64) -> Item {
        Item::new(ItemId(1), "person").with("name", name).with("age", age)
    }

    #[test]
    fn test_ordered_comparisons() {
        let bob = person("Bob", 20);
        assert!(Predicate::at_least("age", 18).evaluate(&bob));
        assert!(Predicate::at_least("age", 20).evaluate(&bob));
        assert!(!Predicate::greater_than("age", 20).evaluate(&bob));
        assert!(Predicate::less_than("name", "Cy").evaluate(&bob));
    }

    #[test]
    fn test_null_and_mixed_kinds_never_order() {
        let bob = person("Bob", 20);
        assert!(!Predicate::at_least("missing", 0).evaluate(&bob));
        assert!(!Predicate::less_than("name", 5).evaluate(&bob));
        assert!(Predicate::is_null("missing").evaluate(&bob));
        assert!(Predicate::equals("missing", Value::Null).evaluate(&bob));
    }

    #[test]
    fn test_and_flattens() {
        let p = Predicate::at_least("age", 18)
            .and(Predicate::equals("name", "Bob"))
            .and(Predicate::True)
            .and(Predicate::not_equals("age", 30));

        match &p {
            Predicate::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("Expected And, got {:?}", other),
        }
        assert!(p.evaluate(&person("Bob", 20)));
        assert!(!p.evaluate(&person("Ann", 20)));
    }

    #[test]
    fn test_or_and_negate() {
        let p = Predicate::equals("name", "Ann").or(Predicate::equals("name", "Bob"));
        assert!(p.evaluate(&person("Bob", 1)));
        assert!(!p.clone().negate().evaluate(&person("Bob", 1)));
        assert!(p.negate().evaluate(&person("Cy", 1)));
    }

    #[test]
    fn test_predicate_serde() {
        let p = Predicate::at_least("age", 18).and(Predicate::is_null("nick"));
        let json = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
