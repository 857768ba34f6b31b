// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Symbol table for labels and predefined addresses.

use std::io::{self, Write};

use crate::core::error::LinkError;

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub addr: i32,
}

/// Insertion-ordered table of name → word address bindings. Lookup is a
/// linear scan; EDSAC programs are a few hundred words at most. Names are
/// case-sensitive.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a label. A second definition of the same name is an error.
    pub fn add(&mut self, name: &str, addr: i32) -> Result<(), LinkError> {
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(LinkError::new(format!(
                "variable '{name}' already exists"
            )));
        }
        self.entries.push(SymbolEntry {
            name: name.to_string(),
            addr,
        });
        Ok(())
    }

    /// Bind a predefined name, overwriting any user definition.
    pub fn bind(&mut self, name: &str, addr: i32) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.addr = addr,
            None => self.entries.push(SymbolEntry {
                name: name.to_string(),
                addr,
            }),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.addr)
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    /// Write the debug-mode symbol dump, one bracketed comment per entry in
    /// definition order.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(out, "[-> {}={}]", entry.name, entry.addr)?;
        }
        Ok(())
    }
}
