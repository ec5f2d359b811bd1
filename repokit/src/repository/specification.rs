//! Composable query predicates
//!
//! A [`Specification`] is an immutable predicate tree. Leaves compare a column
//! against a scalar; [`Specification::And`] and [`Specification::Or`] combine
//! any number of children. Compiling a tree yields a backend-neutral
//! [`Fragment`]: a SQL-like string with `?` placeholders plus the parameters
//! in placeholder order.
//!
//! Trees are compiled verbatim. Column names are not validated and repeated or
//! contradictory leaves are kept as written.
//!
//! # Example
//!
//! ```rust
//! use repokit::repository::specification::{and, Specification};
//!
//! let spec = and([
//!     Specification::greater_or_equal("weight", 90),
//!     Specification::equal("is_available", true),
//! ]);
//! let fragment = spec.compile();
//! assert_eq!(fragment.sql, "(weight >= ? AND is_available = ?)");
//! assert_eq!(fragment.params.len(), 2);
//! ```

use std::fmt;

use super::value::Scalar;

/// Comparison operator of a leaf specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal to (=)
    Equal,
    /// Not equal to (<>)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessOrEqual,
    /// Pattern match (LIKE)
    Like,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "<>"),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
        }
    }
}

/// Compiled form of a specification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Predicate text with one `?` per parameter
    pub sql: String,
    /// Parameters in placeholder order
    pub params: Vec<Scalar>,
}

/// Node of a predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Specification {
    /// `column operator value`
    Condition {
        /// Column name, passed through unchecked
        column: String,
        /// Comparison operator
        operator: Operator,
        /// Right-hand value
        value: Scalar,
    },
    /// Conjunction of the children, in order
    And(Vec<Specification>),
    /// Disjunction of the children, in order
    Or(Vec<Specification>),
}

impl Specification {
    /// Leaf with an arbitrary operator
    pub fn condition(column: impl Into<String>, operator: Operator, value: impl Into<Scalar>) -> Self {
        Self::Condition {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn equal(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::Equal, value)
    }

    /// `column <> value`
    pub fn not_equal(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::NotEqual, value)
    }

    /// `column > value`
    pub fn greater_than(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::GreaterThan, value)
    }

    /// `column >= value`
    pub fn greater_or_equal(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::GreaterOrEqual, value)
    }

    /// `column < value`
    pub fn less_than(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::LessThan, value)
    }

    /// `column <= value`
    pub fn less_or_equal(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::condition(column, Operator::LessOrEqual, value)
    }

    /// `column LIKE pattern`
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::condition(column, Operator::Like, Scalar::Text(pattern.into()))
    }

    /// Compile into a fragment and its ordered parameters
    ///
    /// Children are visited left to right, depth first, so parameter order
    /// always matches placeholder order in the fragment.
    pub fn compile(&self) -> Fragment {
        let mut fragment = Fragment::default();
        self.write_to(&mut fragment);
        fragment
    }

    fn write_to(&self, out: &mut Fragment) {
        match self {
            Self::Condition {
                column,
                operator,
                value,
            } => {
                out.sql.push_str(&format!("{} {} ?", column, operator));
                out.params.push(value.clone());
            }
            Self::And(children) => Self::write_group(children, " AND ", "1 = 1", out),
            Self::Or(children) => Self::write_group(children, " OR ", "1 = 0", out),
        }
    }

    // An empty group keeps its identity element so the fragment stays valid.
    fn write_group(children: &[Specification], joiner: &str, identity: &str, out: &mut Fragment) {
        out.sql.push('(');
        if children.is_empty() {
            out.sql.push_str(identity);
        }
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(joiner);
            }
            child.write_to(out);
        }
        out.sql.push(')');
    }
}

/// Conjunction of `specs`
pub fn and(specs: impl IntoIterator<Item = Specification>) -> Specification {
    Specification::And(specs.into_iter().collect())
}

/// Disjunction of `specs`
pub fn or(specs: impl IntoIterator<Item = Specification>) -> Specification {
    Specification::Or(specs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_display() {
        assert_eq!(Operator::Equal.to_string(), "=");
        assert_eq!(Operator::NotEqual.to_string(), "<>");
        assert_eq!(Operator::GreaterOrEqual.to_string(), ">=");
        assert_eq!(Operator::LessOrEqual.to_string(), "<=");
        assert_eq!(Operator::Like.to_string(), "LIKE");
    }

    #[test]
    fn test_leaf_compiles_to_single_placeholder() {
        let fragment = Specification::equal("name", "widget").compile();
        assert_eq!(fragment.sql, "name = ?");
        assert_eq!(fragment.params, vec![Scalar::from("widget")]);
    }

    #[test]
    fn test_nested_composite_orders_params_depth_first() {
        let spec = and([
            Specification::greater_or_equal("weight", 90),
            or([
                Specification::equal("is_available", true),
                Specification::less_than("weight", 10),
            ]),
            Specification::like("name", "w%"),
        ]);

        let fragment = spec.compile();
        assert_eq!(
            fragment.sql,
            "(weight >= ? AND (is_available = ? OR weight < ?) AND name LIKE ?)"
        );
        assert_eq!(
            fragment.params,
            vec![
                Scalar::Integer(90),
                Scalar::Bool(true),
                Scalar::Integer(10),
                Scalar::from("w%"),
            ]
        );
    }

    #[test]
    fn test_single_child_is_still_parenthesized() {
        let fragment = or([Specification::equal("id", 1)]).compile();
        assert_eq!(fragment.sql, "(id = ?)");
    }

    #[test]
    fn test_empty_groups_compile_to_identity() {
        assert_eq!(Specification::And(vec![]).compile().sql, "(1 = 1)");
        assert_eq!(Specification::Or(vec![]).compile().sql, "(1 = 0)");
        assert!(Specification::And(vec![]).compile().params.is_empty());
    }

    #[test]
    fn test_repeated_leaves_pass_through() {
        let leaf = Specification::equal("id", 1);
        let fragment = and([leaf.clone(), leaf]).compile();
        assert_eq!(fragment.sql, "(id = ? AND id = ?)");
        assert_eq!(fragment.params.len(), 2);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let spec = and([
            Specification::not_equal("status", "BLOCKED"),
            Specification::greater_than("id", 3),
        ]);
        assert_eq!(spec.compile(), spec.compile());
    }
}
