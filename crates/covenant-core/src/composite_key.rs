//! Composite storage keys.
//!
//! A key is `U+0000 tag U+0000 (component U+0000)*`. Because every
//! component is terminated, a partial key built from the leading
//! components is a byte prefix of exactly the keys that extend it:
//! the partial key for owner `alice` never matches owner `alice2`.

use std::fmt;

use crate::error::CoreError;

const SEPARATOR: char = '\u{0}';

/// A structured storage key: a type tag plus ordered identity components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Build a key from a tag and its components.
    ///
    /// Passing only the leading components yields the scan prefix for
    /// every key that shares them.
    pub fn new(tag: &str, components: &[&str]) -> Result<Self, CoreError> {
        if tag.is_empty() {
            return Err(CoreError::InvalidKeyComponent(tag.to_string()));
        }
        let mut key = String::with_capacity(
            2 + tag.len() + components.iter().map(|c| c.len() + 1).sum::<usize>(),
        );
        key.push(SEPARATOR);
        push_component(&mut key, tag)?;
        for component in components {
            push_component(&mut key, component)?;
        }
        Ok(Self(key))
    }

    /// Parse raw key bytes back into a key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let s = std::str::from_utf8(bytes).map_err(|_| CoreError::MalformedKey)?;
        if !s.starts_with(SEPARATOR) || !s.ends_with(SEPARATOR) || s.len() < 3 {
            return Err(CoreError::MalformedKey);
        }
        Ok(Self(s.to_string()))
    }

    /// Split into `(tag, components)`.
    pub fn split(&self) -> (&str, Vec<&str>) {
        let inner = &self.0[1..self.0.len() - 1];
        let mut parts = inner.split(SEPARATOR);
        let tag = parts.next().unwrap_or_default();
        (tag, parts.collect())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }

    /// Whether `other` extends this key (or equals it).
    pub fn is_prefix_of(&self, other: &CompositeKey) -> bool {
        other.0.starts_with(&self.0)
    }
}

fn push_component(key: &mut String, component: &str) -> Result<(), CoreError> {
    if component.contains(SEPARATOR) {
        return Err(CoreError::InvalidKeyComponent(component.to_string()));
    }
    key.push_str(component);
    key.push(SEPARATOR);
    Ok(())
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tag, components) = self.split();
        write!(f, "{}", tag)?;
        for c in components {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}
