//! Diagnostic annotations threaded through log operations.
//!
//! A [`LoggerContext`] is an immutable list of `key=value` pairs. Adding a pair
//! returns a new context that shares every existing pair with its parent, so
//! contexts can be handed to other threads and extended freely.

use std::fmt::{self, Display};
use std::sync::Arc;

#[derive(Debug)]
struct Annotation {
    key: &'static str,
    value: String,
    parent: Option<Arc<Annotation>>,
}

#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    head: Option<Arc<Annotation>>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(&self, key: &'static str, value: impl Display) -> Self {
        Self {
            head: Some(Arc::new(Annotation {
                key,
                value: value.to_string(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Most recent value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut node = self.head.as_deref();
        while let Some(annotation) = node {
            if annotation.key == key {
                return Some(&annotation.value);
            }
            node = annotation.parent.as_deref();
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        let mut node = self.head.as_deref();
        while let Some(annotation) = node {
            pairs.push((annotation.key, annotation.value.as_str()));
            node = annotation.parent.as_deref();
        }
        pairs.reverse();
        pairs
    }
}

impl Display for LoggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (key, value)) in self.pairs().into_iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "]")
    }
}
