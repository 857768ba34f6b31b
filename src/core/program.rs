// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The three passes over the predicate list: layout assigns addresses and
//! builds the symbol table, resolution substitutes symbols under the
//! running origin offset, emission writes the tape text.

use std::io::{self, Write};

use crate::core::error::{Diagnostic, LinkError};
use crate::core::predicate::Predicate;
use crate::core::symbol_table::SymbolTable;
use crate::core::words::InitialOrders;

/// A parsed program: the ordered predicate list plus the Initial Orders
/// selection in force when parsing finished.
#[derive(Debug)]
pub struct Program {
    pub predicates: Vec<Predicate>,
    pub io: InitialOrders,
}

impl Program {
    /// Walk the predicates assigning base addresses, then bind the
    /// predefined symbols: `LAST_INSTRUCTION` is the first free address,
    /// and Initial Orders 2 adds `ONE`, `RETURN` and `ZERO`.
    pub fn layout(&mut self) -> Result<SymbolTable, LinkError> {
        let mut symbols = SymbolTable::new();
        let mut cursor = self.io.base_address();
        for predicate in &mut self.predicates {
            cursor = predicate.layout(cursor, &mut symbols)?;
        }
        symbols.bind("LAST_INSTRUCTION", cursor);
        if self.io == InitialOrders::Two {
            symbols.bind("ONE", 2);
            symbols.bind("RETURN", 3);
            symbols.bind("ZERO", 41);
        }
        Ok(symbols)
    }

    /// Walk the predicates substituting symbolic addresses. The origin
    /// offset starts at zero and is advanced by each `G … K`/`G … Z`
    /// directive in document order; it exists only for the duration of
    /// this walk.
    pub fn resolve(
        &mut self,
        symbols: &SymbolTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), LinkError> {
        let mut origin_offset = 0;
        for predicate in &mut self.predicates {
            origin_offset = predicate.resolve(symbols, origin_offset, self.io, diagnostics)?;
        }
        Ok(())
    }

    /// Write the tape. Non-debug output is the bare concatenation of word
    /// texts; debug output frames each unit on its own line and appends
    /// the symbol dump.
    pub fn emit<W: Write>(
        &self,
        out: &mut W,
        debug: bool,
        symbols: &SymbolTable,
    ) -> io::Result<()> {
        if debug {
            writeln!(out, "[Initial Orders {}]", self.io.number())?;
        }
        for predicate in &self.predicates {
            predicate.emit(out, self.io, debug)?;
        }
        if debug {
            writeln!(out, "[-------------]")?;
            writeln!(out, "[VARS SECTION]")?;
            symbols.dump(out)?;
        }
        Ok(())
    }
}
