//! Named text registers persisted between script runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of registers filled automatically when commands are skipped.
pub const SAVED_PREFIX: &str = "_saved_";

/// Register contents plus the counter for auto-saved names.
///
/// Hosts pass the value returned by one run into the next to keep both the
/// registers and the `_saved_N` numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registers {
    #[serde(default)]
    pub registers: BTreeMap<String, String>,
    #[serde(default = "first_saved_id")]
    pub next_saved_id: u64,
}

fn first_saved_id() -> u64 {
    1
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            registers: BTreeMap::new(),
            next_saved_id: first_saved_id(),
        }
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.registers.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.registers.insert(name.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Store `text` under a fresh `_saved_N` name and return the record.
    pub fn save(&mut self, text: &str) -> SavedRegister {
        let mut name = format!("{SAVED_PREFIX}{}", self.next_saved_id);
        self.next_saved_id += 1;
        // A caller may have used a `_saved_N` name by hand; never overwrite it.
        while self.registers.contains_key(&name) {
            name = format!("{SAVED_PREFIX}{}", self.next_saved_id);
            self.next_saved_id += 1;
        }
        self.registers.insert(name.clone(), text.to_string());
        SavedRegister {
            name,
            size: text.chars().count(),
        }
    }
}

/// A register auto-filled with text from a skipped command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRegister {
    pub name: String,
    /// Length of the saved text in characters.
    pub size: usize,
}
