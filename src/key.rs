//! Record keys
//!
//! A key is either an integer or a string. Both are reduced to one canonical
//! text form before reaching the engine: integers as their decimal digits,
//! strings verbatim, encoded as UTF-8.
//!
//! Consequently `Key::Integer(123)` and `Key::Text("123")` address the same
//! record. Callers rely on this, so it must never change.

use std::borrow::Cow;
use std::fmt;

/// Logical key of one record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Integer(i64),
    Text(String),
}

impl Key {
    /// Canonical text form
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            Key::Integer(n) => Cow::Owned(n.to_string()),
            Key::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Byte key handed to the engine
    pub fn to_bytes(&self) -> Vec<u8> {
        self.canonical().into_owned().into_bytes()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Integer(n.into())
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Integer(n.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Text(s.clone())
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
