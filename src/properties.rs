//! Per-field annotation parsing.
//!
//! An annotation is a comma-separated list of `key` or `key=value` tokens,
//! e.g. `size=80,unique,check=(age>18)`. Commas inside single quotes, double
//! quotes, or balanced `()`, `{}`, `[]` do not split tokens. A bare `key`
//! records the sentinel value `"t"` (truthy presence).

use std::collections::HashMap;

use crate::error::Error;

const SINGLE_QUOTE_OPENED: u32 = 0x01;
const DOUBLE_QUOTE_OPENED: u32 = 0x02;
const PAREN_OPENED: u32 = 0x04;
const BRACE_OPENED: u32 = 0x08;
const BRACKET_OPENED: u32 = 0x10;

/// Split an annotation string on top-level commas.
///
/// A single-pass scan carries a bitmask of open delimiter states; a comma is
/// a separator only while the mask is zero. Quote states toggle, bracket
/// states set and clear. Trailing content without a separator is still
/// emitted as the final token.
pub fn split_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut opened: u32 = 0;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '\'' => {
                opened ^= SINGLE_QUOTE_OPENED;
                current.push(c);
            }
            '"' => {
                opened ^= DOUBLE_QUOTE_OPENED;
                current.push(c);
            }
            '(' => {
                opened |= PAREN_OPENED;
                current.push(c);
            }
            ')' => {
                opened &= !PAREN_OPENED;
                current.push(c);
            }
            '{' => {
                opened |= BRACE_OPENED;
                current.push(c);
            }
            '}' => {
                opened &= !BRACE_OPENED;
                current.push(c);
            }
            '[' => {
                opened |= BRACKET_OPENED;
                current.push(c);
            }
            ']' => {
                opened &= !BRACKET_OPENED;
                current.push(c);
            }
            ',' => {
                if opened == 0 {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                } else {
                    current.push(c);
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parsed key/value annotation data attached to one field.
///
/// Keys are case-sensitive. Lookups never mutate unless explicitly popping.
/// Typed accessors report "absent" and "present but unparsable" identically
/// as not-found, falling back to the supplied default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    entries: HashMap<String, String>,
}

impl PropertySet {
    pub fn new() -> Self {
        PropertySet {
            entries: HashMap::new(),
        }
    }

    /// Parse an annotation string into a property set.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut props = PropertySet::new();
        if s.is_empty() {
            return Ok(props);
        }
        for token in split_tokens(s) {
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((key, value)) => {
                    props.entries.insert(key.to_string(), value.to_string());
                }
                None => {
                    props.entries.insert(token, "t".to_string());
                }
            }
        }
        Ok(props)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys currently present, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get_str(&self, key: &str, default: &str) -> (String, bool) {
        match self.entries.get(key) {
            Some(v) => (v.clone(), true),
            None => (default.to_string(), false),
        }
    }

    pub fn pop_str(&mut self, key: &str, default: &str) -> (String, bool) {
        let (v, found) = self.get_str(key, default);
        if found {
            self.entries.remove(key);
        }
        (v, found)
    }

    pub fn get_int(&self, key: &str, default: i64) -> (i64, bool) {
        match self.entries.get(key) {
            Some(v) => match v.parse::<i64>() {
                Ok(n) => (n, true),
                Err(_) => (default, false),
            },
            None => (default, false),
        }
    }

    pub fn pop_int(&mut self, key: &str, default: i64) -> (i64, bool) {
        let (v, found) = self.get_int(key, default);
        if found {
            self.entries.remove(key);
        }
        (v, found)
    }

    pub fn get_uint(&self, key: &str, default: u64) -> (u64, bool) {
        match self.entries.get(key) {
            Some(v) => match v.parse::<u64>() {
                Ok(n) => (n, true),
                Err(_) => (default, false),
            },
            None => (default, false),
        }
    }

    pub fn pop_uint(&mut self, key: &str, default: u64) -> (u64, bool) {
        let (v, found) = self.get_uint(key, default);
        if found {
            self.entries.remove(key);
        }
        (v, found)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> (bool, bool) {
        match self.entries.get(key) {
            Some(v) => match v.to_lowercase().as_str() {
                "t" | "true" | "yes" | "ok" | "y" => (true, true),
                "f" | "false" | "no" | "n" => (false, true),
                _ => (default, false),
            },
            None => (default, false),
        }
    }

    pub fn pop_bool(&mut self, key: &str, default: bool) -> (bool, bool) {
        let (v, found) = self.get_bool(key, default);
        if found {
            self.entries.remove(key);
        }
        (v, found)
    }
}
