//! Expression results

use mlua::Value;
use std::fmt;

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    /// `nil`
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// String
    String(String),
    /// Any other value, by type name (tables, functions, userdata)
    Other(&'static str),
}

impl ExprValue {
    /// Boolean content
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is `nil`
    #[inline]
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub(crate) fn from_lua(value: &Value) -> Self {
        match value {
            Value::Nil => Self::Nil,
            Value::Boolean(b) => Self::Bool(*b),
            Value::Integer(i) => Self::Integer(*i),
            Value::Number(n) => Self::Number(*n),
            Value::String(s) => Self::String(String::from(s.to_string_lossy())),
            other => Self::Other(other.type_name()),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Other(type_name) => write!(f, "<{type_name}>"),
        }
    }
}
