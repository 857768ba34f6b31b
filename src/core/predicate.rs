// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The intermediate program is an ordered list of predicates: self-describing
//! emission units. Each variant knows how to claim its words during layout,
//! substitute its symbolic address during resolution, and write its tape
//! text. Order in the list is emission order and fixes every address.

use std::io::{self, Write};

use crate::core::error::{Diagnostic, LinkError};
use crate::core::symbol_table::SymbolTable;
use crate::core::words::{word_of_value, InitialOrders, TapeWord};

/// An instruction operand: either already numeric or a name resolved during
/// the link walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Symbol(String),
    Literal(i32),
}

/// A named binding. Occupies zero words; layout registers the name at the
/// current cursor. `bias` shifts the binding forward and is set only for
/// labels owning a two-word constant, so references hit the low word.
#[derive(Debug, Clone)]
pub struct LabelDef {
    pub name: String,
    pub bias: i32,
}

/// Instructions occupy one word; directives (`K`/`Z`-suffixed commands
/// under Initial Orders 2) occupy none but still emit and steer the origin
/// offset when their opcode is `G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Instruction,
    Directive,
}

/// One machine order: opcode letter, operand, optional long flag, suffix
/// letter. `pc` is filled during layout.
#[derive(Debug, Clone)]
pub struct Command {
    pub opcode: char,
    pub address: Address,
    pub long: bool,
    pub suffix: char,
    pub kind: CommandKind,
    pub pc: i32,
}

impl Command {
    pub fn new(opcode: char, address: Address, long: bool, suffix: char, kind: CommandKind) -> Self {
        Self {
            opcode,
            address,
            long,
            suffix,
            kind,
            pc: 0,
        }
    }

    fn numeric_address(&self) -> i32 {
        match self.address {
            Address::Literal(value) => value,
            // Resolution rewrites every symbol before emission or offset
            // updates; a leftover symbol is a pass-ordering bug.
            Address::Symbol(_) => unreachable!("unresolved address survived the link pass"),
        }
    }

    fn resolve(
        &mut self,
        symbols: &SymbolTable,
        origin_offset: i32,
        io: InitialOrders,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), LinkError> {
        let Address::Symbol(name) = &self.address else {
            return Ok(());
        };
        let value = symbols
            .lookup(name)
            .ok_or_else(|| LinkError::new(format!("no such variable '{name}'")))?;
        let resolved = if io == InitialOrders::Two {
            let biased = match self.suffix {
                'F' | 'K' => value,
                '@' | 'Z' => value - origin_offset,
                _ => {
                    diagnostics.push(Diagnostic::link_warning(format!(
                        "can't link properly \"{} {} {}\" suffix must be F, K, @ or Z",
                        self.opcode, name, self.suffix
                    )));
                    value
                }
            };
            if biased < 0 {
                return Err(LinkError::new(format!(
                    "link result address is lower than 0. Did you reference to the \
                     variable that is out of the scope? Instruction: \"{} {} {}\"",
                    self.opcode, name, self.suffix
                )));
            }
            biased
        } else {
            value
        };
        self.address = Address::Literal(resolved);
        Ok(())
    }

    /// New origin offset after this predicate. Only a `G … K`/`G … Z`
    /// directive changes it: `K` sets `addr + pc`, `Z` sets `addr + 2*pc`
    /// (the second `pc` mirrors the established behaviour and is
    /// load-bearing for existing tapes).
    fn origin_update(&self, current: i32) -> i32 {
        if self.kind != CommandKind::Directive || self.opcode != 'G' {
            return current;
        }
        match self.suffix {
            'K' => self.numeric_address() + self.pc,
            'Z' => self.numeric_address() + 2 * self.pc,
            _ => current,
        }
    }

    fn write_word<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.opcode)?;
        let address = self.numeric_address();
        if address != 0 {
            write!(out, "{address}")?;
        }
        if self.long {
            write!(out, "#")?;
        }
        write!(out, "{}", self.suffix)
    }
}

/// A run of already-split constant words. Occupies one word per entry.
#[derive(Debug, Clone)]
pub struct ConstBlock {
    pub words: Vec<TapeWord>,
    pub pc: i32,
}

impl ConstBlock {
    pub fn new(words: Vec<TapeWord>) -> Self {
        Self { words, pc: 0 }
    }
}

/// The one-word header of an array: resolves to the address of the first
/// data word behind it, so loading the owning label yields the base
/// address indexed access needs.
#[derive(Debug, Clone)]
pub struct ArrayPointer {
    pub pc: i32,
    pub value: i32,
}

impl ArrayPointer {
    pub fn new() -> Self {
        Self { pc: 0, value: 0 }
    }
}

impl Default for ArrayPointer {
    fn default() -> Self {
        Self::new()
    }
}

/// One unit of the intermediate program.
#[derive(Debug, Clone)]
pub enum Predicate {
    Label(LabelDef),
    Command(Command),
    Const(ConstBlock),
    ArrayPointer(ArrayPointer),
    /// Unclassifiable source text preserved verbatim in the output.
    RawText(String),
}

impl Predicate {
    /// Claim words starting at `cursor`, register any binding, and return
    /// the next free address.
    pub fn layout(&mut self, cursor: i32, symbols: &mut SymbolTable) -> Result<i32, LinkError> {
        match self {
            Predicate::Label(label) => {
                symbols.add(&label.name, cursor + label.bias)?;
                Ok(cursor)
            }
            Predicate::Command(command) => {
                command.pc = cursor;
                Ok(match command.kind {
                    CommandKind::Instruction => cursor + 1,
                    CommandKind::Directive => cursor,
                })
            }
            Predicate::Const(block) => {
                block.pc = cursor;
                Ok(cursor + block.words.len() as i32)
            }
            Predicate::ArrayPointer(pointer) => {
                pointer.pc = cursor;
                Ok(cursor + 1)
            }
            Predicate::RawText(_) => Ok(cursor),
        }
    }

    /// Substitute symbolic addresses and report the origin offset in force
    /// after this predicate.
    pub fn resolve(
        &mut self,
        symbols: &SymbolTable,
        origin_offset: i32,
        io: InitialOrders,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<i32, LinkError> {
        match self {
            Predicate::Command(command) => {
                command.resolve(symbols, origin_offset, io, diagnostics)?;
                Ok(command.origin_update(origin_offset))
            }
            Predicate::ArrayPointer(pointer) => {
                pointer.value = pointer.pc + 1;
                Ok(origin_offset)
            }
            _ => Ok(origin_offset),
        }
    }

    /// Write the tape text. Debug mode frames every unit with its kind tag
    /// and address and puts it on its own line.
    pub fn emit<W: Write>(&self, out: &mut W, io: InitialOrders, debug: bool) -> io::Result<()> {
        match self {
            Predicate::Label(label) => {
                if debug {
                    writeln!(out, "[{}:]", label.name)?;
                }
                Ok(())
            }
            Predicate::Command(command) => {
                if debug {
                    match command.kind {
                        CommandKind::Instruction => write!(out, "    [i {}]", command.pc)?,
                        CommandKind::Directive => write!(out, "    [d ~]")?,
                    }
                }
                command.write_word(out)?;
                if debug {
                    writeln!(out)?;
                }
                Ok(())
            }
            Predicate::Const(block) => {
                if debug {
                    write!(out, "    [$ {}]", block.pc)?;
                }
                for (k, word) in block.words.iter().enumerate() {
                    if debug {
                        write!(out, "[{k}]")?;
                    }
                    write!(out, "{}", word.render(io))?;
                }
                if debug {
                    writeln!(out)?;
                }
                Ok(())
            }
            Predicate::ArrayPointer(pointer) => {
                if debug {
                    write!(out, "    [^ {}]", pointer.pc)?;
                }
                write!(out, "{}", word_of_value(pointer.value).render(io))?;
                if debug {
                    writeln!(out)?;
                }
                Ok(())
            }
            Predicate::RawText(text) => write!(out, "{text}"),
        }
    }
}
