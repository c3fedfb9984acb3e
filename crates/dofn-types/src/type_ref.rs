//! Type references used in lifecycle method signatures.
//!
//! A [`TypeRef`] names the element type carried by a context parameter
//! (`InputProvider<T>`, `OutputReceiver<T>`) or the input/output type of a
//! DoFn. Concrete types are identified by their full Rust path, as reported by
//! [`std::any::type_name`], and rendered with module paths stripped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A possibly generic type as written in a method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TypeRef {
    /// A concrete type, identified by its fully qualified path.
    Named(String),
    /// A type variable of the enclosing DoFn or method, e.g. `InputT`.
    Variable(String),
    /// `?`, `? super T` or `? extends T`.
    Wildcard(Option<WildcardBound>),
}

/// Bound of a wildcard type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardBound {
    Super(Box<TypeRef>),
    Extends(Box<TypeRef>),
}

impl TypeRef {
    /// Reference to the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeRef::Named(std::any::type_name::<T>().to_string())
    }

    /// Reference to a concrete type by path.
    pub fn named(path: impl Into<String>) -> Self {
        TypeRef::Named(path.into())
    }

    /// A type variable.
    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Variable(name.into())
    }

    /// The unbounded wildcard `?`.
    pub fn wildcard() -> Self {
        TypeRef::Wildcard(None)
    }

    /// `? super bound`
    pub fn super_of(bound: TypeRef) -> Self {
        TypeRef::Wildcard(Some(WildcardBound::Super(Box::new(bound))))
    }

    /// `? extends bound`
    pub fn extends(bound: TypeRef) -> Self {
        TypeRef::Wildcard(Some(WildcardBound::Extends(Box::new(bound))))
    }

    /// Check whether a parameter declared with this type argument can be
    /// supplied with values of `required`.
    ///
    /// Accepts an exact match (including the same type variable), the
    /// unbounded wildcard, and a wildcard whose bound is `required` itself.
    /// There is no subtyping between distinct named types.
    pub fn accepts(&self, required: &TypeRef) -> bool {
        match self {
            TypeRef::Wildcard(None) => true,
            TypeRef::Wildcard(Some(WildcardBound::Super(bound)))
            | TypeRef::Wildcard(Some(WildcardBound::Extends(bound))) => bound.as_ref() == required,
            declared => declared == required,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(path) => write!(f, "{}", short_type_name(path)),
            TypeRef::Variable(name) => write!(f, "{}", name),
            TypeRef::Wildcard(None) => write!(f, "?"),
            TypeRef::Wildcard(Some(WildcardBound::Super(bound))) => write!(f, "? super {}", bound),
            TypeRef::Wildcard(Some(WildcardBound::Extends(bound))) => {
                write!(f, "? extends {}", bound)
            }
        }
    }
}

/// Strip module paths from every path segment of a Rust type name.
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`; generic
/// arguments, references and tuples keep their punctuation.
pub fn short_type_name(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut token_start: Option<usize> = None;

    for (i, c) in path.char_indices() {
        let in_path = c.is_alphanumeric() || c == '_' || c == ':';
        match (in_path, token_start) {
            (true, None) => token_start = Some(i),
            (false, Some(start)) => {
                out.push_str(last_segment(&path[start..i]));
                out.push(c);
                token_start = None;
            }
            (false, None) => out.push(c),
            (true, Some(_)) => {}
        }
    }

    if let Some(start) = token_start {
        out.push_str(last_segment(&path[start..]));
    }

    out
}

fn last_segment(token: &str) -> &str {
    token.rsplit("::").next().unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name_plain() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(short_type_name("i32"), "i32");
    }

    #[test]
    fn test_short_type_name_generic() {
        assert_eq!(
            short_type_name("alloc::vec::Vec<alloc::string::String>"),
            "Vec<String>"
        );
        assert_eq!(
            short_type_name("std::collections::hash::map::HashMap<u64, alloc::vec::Vec<u8>>"),
            "HashMap<u64, Vec<u8>>"
        );
        assert_eq!(short_type_name("&'static str"), "&'static str");
        assert_eq!(short_type_name("(u8, core::option::Option<i64>)"), "(u8, Option<i64>)");
    }

    #[test]
    fn test_display_wildcards() {
        let string = TypeRef::of::<String>();
        assert_eq!(TypeRef::wildcard().to_string(), "?");
        assert_eq!(TypeRef::super_of(string.clone()).to_string(), "? super String");
        assert_eq!(TypeRef::extends(string).to_string(), "? extends String");
        assert_eq!(TypeRef::var("OutputT").to_string(), "OutputT");
    }

    #[test]
    fn test_accepts_exact_and_wildcards() {
        let string = TypeRef::of::<String>();
        let int = TypeRef::of::<i32>();

        assert!(string.accepts(&string));
        assert!(!int.accepts(&string));
        assert!(TypeRef::wildcard().accepts(&string));
        assert!(TypeRef::super_of(string.clone()).accepts(&string));
        assert!(TypeRef::extends(string.clone()).accepts(&string));
        assert!(!TypeRef::super_of(int).accepts(&string));
    }

    #[test]
    fn test_accepts_type_variables() {
        let input = TypeRef::var("InputT");
        let output = TypeRef::var("OutputT");

        assert!(output.accepts(&output));
        assert!(!input.accepts(&output));
        assert!(!TypeRef::of::<String>().accepts(&output));
    }
}
