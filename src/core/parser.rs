// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The translator front end: a position-advancing scanner over the whole
//! source buffer with one sub-parser per construct. Each sub-parser appends
//! predicates to the growing program; `for` blocks and indexed array access
//! are lowered to their full instruction scaffolding right here, so the
//! later passes never see source-level constructs.

use std::collections::HashMap;

use crate::core::error::{Diagnostic, ParseError};
use crate::core::predicate::{
    Address, ArrayPointer, Command, CommandKind, ConstBlock, LabelDef, Predicate,
};
use crate::core::program::Program;
use crate::core::text_utils::{find_word_end, is_digit, is_space, line_col};
use crate::core::words::{
    const_call_word, split_integer, word_of_value, InitialOrders, TapeWord, WidthHint,
};

/// Opcode letters that open an instruction.
const INST_LIST: &[u8] = b"ASHVNTUCRLEGIOFXYZP";

/// Literal word filling unset array slots, identical under both Initial
/// Orders versions.
const ARRAY_FILLER: &str = "PS";

/// Everything the front end produced: the program, the non-fatal
/// diagnostics, and the recorded `~define` table (recorded only; nothing
/// downstream substitutes through it).
pub struct ParseOutcome {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
    pub defines: HashMap<String, String>,
}

struct ForFrame {
    prefix: String,
    var: String,
}

enum IndexExpr {
    Literal(i32),
    Var(String),
}

pub struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    io: InitialOrders,
    predicates: Vec<Predicate>,
    diagnostics: Vec<Diagnostic>,
    defines: HashMap<String, String>,
    for_stack: Vec<ForFrame>,
    for_seq: u32,
    index_seq: u32,
    specials_emitted: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, io: InitialOrders) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            io,
            predicates: Vec::new(),
            diagnostics: Vec::new(),
            defines: HashMap::new(),
            for_stack: Vec::new(),
            for_seq: 0,
            index_seq: 0,
            specials_emitted: false,
        }
    }

    pub fn parse(mut self) -> Result<ParseOutcome, ParseError> {
        self.skip_space();
        while self.pos < self.bytes.len() {
            self.step()?;
            self.skip_space();
        }
        if let Some(frame) = self.for_stack.last() {
            return Err(self.error_here(format!(
                "for block over '{}' is not closed with 'end'",
                frame.var
            )));
        }
        Ok(ParseOutcome {
            program: Program {
                predicates: self.predicates,
                io: self.io,
            },
            diagnostics: self.diagnostics,
            defines: self.defines,
        })
    }

    /// Dispatch on the word at the cursor: trailing-colon labels first,
    /// then the leading character, then the keyword table.
    fn step(&mut self) -> Result<(), ParseError> {
        let bytes = self.bytes;
        let word_end = find_word_end(bytes, self.pos);
        if word_end > self.pos && bytes[word_end - 1] == b':' {
            return self.parse_label_and_attachment();
        }
        match bytes[self.pos] {
            b'/' if self.at(self.pos + 1) == b'/' => {
                self.skip_line();
                Ok(())
            }
            b'/' if self.at(self.pos + 1) == b'*' => self.skip_block_comment(),
            b'[' => self.skip_edsac_comment(),
            b':' | b'$' => self.parse_label_and_attachment(),
            b'~' => self.parse_directive(),
            first => {
                let word = &bytes[self.pos..word_end];
                match word {
                    b"for" => self.parse_for(),
                    b"redo" | b"break" | b"continue" => {
                        let keyword = String::from_utf8_lossy(word).into_owned();
                        self.parse_loop_jump(&keyword)
                    }
                    b"end" => self.parse_loop_end(),
                    _ if bytes[self.pos..].starts_with(b"CONST(") => self.parse_const_call(),
                    _ if INST_LIST.contains(&first) => self.parse_instruction(),
                    _ => {
                        self.push_raw_word();
                        Ok(())
                    }
                }
            }
        }
    }

    // ----- labels -------------------------------------------------------

    /// Parse any label form; a constant definition directly after it is
    /// attached (mandatory after `$name`, optional after the colon forms).
    fn parse_label_and_attachment(&mut self) -> Result<(), ParseError> {
        let dollar = self.peek() == b'$';
        self.parse_label()?;
        self.skip_space();
        if dollar {
            if self.peek() == b'=' || self.bytes[self.pos..].starts_with(b"CONST(") {
                self.parse_const()
            } else {
                Err(self.error_here("expected a constant definition after the label"))
            }
        } else if self.peek() == b'=' {
            self.parse_const()
        } else {
            Ok(())
        }
    }

    fn parse_label(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        if self.peek() == b'$' {
            self.pos += 1;
            if is_space(self.peek()) {
                return Err(self.error_here("unexpected space character before variable name"));
            }
            let name_start = self.pos;
            while self.pos < self.bytes.len()
                && !is_space(self.bytes[self.pos])
                && self.bytes[self.pos] != b'='
            {
                self.pos += 1;
            }
            let name = self.text(name_start, self.pos);
            if name.is_empty() {
                return Err(self.error_at(start, "empty variable name"));
            }
            self.push_label(name);
            return Ok(());
        }
        if self.peek() == b':' {
            self.pos += 1;
        }
        if is_space(self.peek()) {
            return Err(self.error_here("unexpected space character before variable name"));
        }
        let name_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b':' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(self.error_at(start, "EOF reached, can't find character ':'"));
        }
        let name = self.text(name_start, self.pos);
        if name.is_empty() {
            return Err(self.error_at(start, "empty variable name"));
        }
        self.pos += 1;
        self.push_label(name);
        Ok(())
    }

    // ----- instructions -------------------------------------------------

    fn parse_instruction(&mut self) -> Result<(), ParseError> {
        let opcode = self.peek() as char;
        self.pos += 1;
        let mut address = Address::Literal(0);
        // The operand branch only opens on whitespace or a digit after the
        // opcode letter; `TF` is `T 0 F`.
        let next = self.peek();
        if is_space(next) || is_digit(next) {
            self.skip_space();
            if self.at_int_literal() {
                address = Address::Literal(self.read_int());
            } else {
                let name_start = self.pos;
                while self.pos < self.bytes.len()
                    && !is_space(self.bytes[self.pos])
                    && self.bytes[self.pos] != b'['
                {
                    self.pos += 1;
                }
                let name = self.text(name_start, self.pos);
                if self.peek() == b'[' {
                    if name.is_empty() {
                        return Err(self.error_at(name_start, "missing array name before '['"));
                    }
                    return self.lower_indexed(opcode, name);
                }
                address = Address::Symbol(name);
            }
            self.skip_space();
        }
        let mut long = false;
        if self.io.allows_long_flag() && self.peek() == b'#' {
            long = true;
            self.pos += 1;
        }
        let suffix = self.take_suffix()?;
        let kind = if self.io == InitialOrders::Two && (suffix == 'K' || suffix == 'Z') {
            CommandKind::Directive
        } else {
            CommandKind::Instruction
        };
        self.predicates
            .push(Predicate::Command(Command::new(opcode, address, long, suffix, kind)));
        Ok(())
    }

    /// Lower `op VAR[idx] sfx` into the self-modifying patch sequence:
    /// save the accumulator, compose base+index shifted into the operand
    /// field plus the opcode template, store the result into a fresh slot,
    /// restore the accumulator and fall through into the patched word.
    fn lower_indexed(&mut self, opcode: char, base: String) -> Result<(), ParseError> {
        let template = match opcode {
            'A' => "edsacc#add",
            'S' => "edsacc#sub",
            'T' => "edsacc#store",
            'U' => "edsacc#save",
            _ => {
                return Err(
                    self.error_here(format!("operation '{opcode}' does not support indexing"))
                )
            }
        };
        self.pos += 1;
        self.skip_space();
        let index = if self.at_int_literal() {
            IndexExpr::Literal(self.read_int())
        } else {
            let name_start = self.pos;
            while self.pos < self.bytes.len()
                && !is_space(self.bytes[self.pos])
                && self.bytes[self.pos] != b']'
            {
                self.pos += 1;
            }
            let name = self.text(name_start, self.pos);
            if name.is_empty() {
                return Err(self.error_at(name_start, "empty index expression"));
            }
            IndexExpr::Var(name)
        };
        self.skip_space();
        if self.peek() != b']' {
            return Err(self.error_here("expected ']' after the index expression"));
        }
        self.pos += 1;
        self.skip_space();
        if self.io.allows_long_flag() && self.peek() == b'#' {
            self.pos += 1;
            let (line, col) = line_col(self.bytes, self.pos);
            self.diagnostics.push(Diagnostic::parse_warning(
                line,
                col,
                format!("long operand ignored for indexed access to '{base}'"),
            ));
        }
        let suffix = self.take_suffix()?;

        let prefix = format!("edsacc#index#{}", self.index_seq);
        self.index_seq += 1;
        let pad = self.io.pad_suffix();
        self.push_instruction('T', Address::Symbol("edsacc#tmp".into()), pad);
        self.push_instruction('A', Address::Symbol(base), suffix);
        match &index {
            IndexExpr::Var(name) => {
                self.push_instruction('A', Address::Symbol(name.clone()), pad)
            }
            IndexExpr::Literal(_) => {
                self.push_instruction('A', Address::Symbol(format!("{prefix}#idx")), pad)
            }
        }
        self.push_instruction('L', Address::Literal(0), self.io.shift_suffix());
        self.push_instruction('A', Address::Symbol(template.into()), pad);
        self.push_instruction('T', Address::Symbol(format!("{prefix}#slot")), pad);
        self.push_instruction('A', Address::Symbol("edsacc#tmp".into()), pad);
        self.push_label(format!("{prefix}#slot"));
        self.predicates
            .push(Predicate::Const(ConstBlock::new(vec![word_of_value(0)])));
        if let IndexExpr::Literal(value) = index {
            self.push_label(format!("{prefix}#idx"));
            self.predicates
                .push(Predicate::Const(ConstBlock::new(vec![word_of_value(value)])));
        }
        Ok(())
    }

    // ----- constants and arrays -----------------------------------------

    fn parse_const(&mut self) -> Result<(), ParseError> {
        if self.peek() == b'=' {
            self.pos += 1;
            self.skip_space();
            if self.peek() == b'[' || self.peek() == b'{' {
                self.parse_array()
            } else {
                self.parse_integer_constant()
            }
        } else if self.bytes[self.pos..].starts_with(b"CONST(") {
            self.parse_const_call()
        } else {
            Err(self.error_here("expected a constant definition"))
        }
    }

    fn parse_integer_constant(&mut self) -> Result<(), ParseError> {
        if !self.at_int_literal() {
            return Err(self.error_here(format!(
                "unexpected character in constant literal '{}'",
                self.peek() as char
            )));
        }
        let value = self.read_int();
        let mut width = WidthHint::Auto;
        let marker = self.peek();
        if marker == b's' || marker == b'l' {
            let after = self.at(self.pos + 1);
            if after != 0 && !is_space(after) {
                return Err(self.error_at(
                    self.pos + 1,
                    format!("unexpected character in constant literal '{}'", after as char),
                ));
            }
            width = WidthHint::from_marker(marker);
            self.pos += 1;
        } else if marker == 0 || is_space(marker) {
            // A lone `s`/`l` word after the number is the width.
            let mark = self.pos;
            self.skip_space();
            let end = find_word_end(self.bytes, self.pos);
            match &self.bytes[self.pos..end] {
                word @ (b"s" | b"l") => {
                    width = WidthHint::from_marker(word[0]);
                    self.pos = end;
                }
                _ => self.pos = mark,
            }
        } else {
            return Err(self.error_here(format!(
                "unexpected character in constant literal '{}'",
                marker as char
            )));
        }
        let words = split_integer(value, width);
        if words.len() == 2 {
            // Bind the owning label, when there is one, to the low word.
            if let Some(Predicate::Label(label)) = self.predicates.last_mut() {
                label.bias = 1;
            }
        }
        self.predicates.push(Predicate::Const(ConstBlock::new(words)));
        Ok(())
    }

    fn parse_array(&mut self) -> Result<(), ParseError> {
        let mut reserve: Option<i32> = None;
        if self.peek() == b'[' {
            let close = self.find_closing(self.pos, b']')?;
            self.pos += 1;
            self.skip_space();
            if !self.at_int_literal() {
                return Err(
                    self.error_here("only a number literal is supported in the allocation block")
                );
            }
            let count = self.read_int();
            if count < 0 {
                return Err(self.error_here(format!(
                    "can't allocate negative {count} number of short elements"
                )));
            }
            self.skip_space();
            if self.pos != close {
                return Err(
                    self.error_here("only a number literal is supported in the allocation block")
                );
            }
            self.pos = close + 1;
            self.skip_space();
            reserve = Some(count);
        }
        let mut words = Vec::new();
        if self.peek() == b'{' {
            let close = self.find_closing(self.pos, b'}')?;
            self.pos += 1;
            self.skip_space();
            while self.pos < close {
                let value = self.read_int();
                let marker = self.peek();
                if marker != b's'
                    && marker != b'l'
                    && marker != b','
                    && marker != b'}'
                    && !is_space(marker)
                {
                    return Err(self.error_here(format!(
                        "unexpected character in array initialization block '{}'",
                        marker as char
                    )));
                }
                words.extend(split_integer(value, WidthHint::from_marker(marker)));
                if marker == b's' || marker == b'l' {
                    self.pos += 1;
                }
                self.skip_space();
                if self.pos >= close {
                    break;
                }
                if self.peek() != b',' {
                    return Err(self.error_here(
                        "only integer literals are supported in the array initialization block",
                    ));
                }
                self.pos += 1;
                self.skip_space();
            }
            self.pos = close + 1;
        }
        if let Some(count) = reserve {
            let have = words.len() as i32;
            if count < have {
                return Err(self.error_here(format!(
                    "allocated number {count} lower than the {have} elements initialized"
                )));
            }
            for _ in 0..(count - have) {
                words.push(TapeWord::Verbatim(ARRAY_FILLER.to_string()));
            }
        }
        // The pointer word precedes the data, so the owning label resolves
        // to it; its value becomes the address of the first data word.
        self.predicates.push(Predicate::ArrayPointer(ArrayPointer::new()));
        self.predicates.push(Predicate::Const(ConstBlock::new(words)));
        Ok(())
    }

    fn parse_const_call(&mut self) -> Result<(), ParseError> {
        self.pos += 5; // leaves the cursor on '('
        let close = self.find_closing(self.pos, b')')?;
        self.pos += 1;
        self.skip_space();
        let value = self.read_int();
        self.skip_space();
        if self.peek() != b',' {
            return Err(
                self.error_here("function CONST(int n, char postfix) expects 2 parameters")
            );
        }
        self.pos += 1;
        self.skip_space();
        let suffix = self.peek();
        if suffix == 0 {
            return Err(
                self.error_here("function CONST(int n, char postfix) expects 2 parameters")
            );
        }
        self.pos += 1;
        self.skip_space();
        if self.pos != close {
            return Err(self.error_here("closing bracket expected"));
        }
        self.pos = close + 1;
        self.predicates.push(Predicate::Const(ConstBlock::new(vec![
            const_call_word(value, suffix as char),
        ])));
        Ok(())
    }

    // ----- preprocessor -------------------------------------------------

    fn parse_directive(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let name_end = find_word_end(self.bytes, self.pos);
        let name = self.text(self.pos, name_end);
        self.pos = name_end;
        match name.as_str() {
            "io" => {
                self.skip_inline_space();
                if !is_digit(self.peek()) {
                    return Err(self.error_here("'~io' expects a version number"));
                }
                let version = self.read_int();
                let io = InitialOrders::from_number(version).ok_or_else(|| {
                    self.error_at(
                        start,
                        format!("unsupported specification: Initial Orders {version}"),
                    )
                })?;
                if !self.predicates.is_empty() {
                    return Err(self.error_at(start, "'~io' must appear before any code"));
                }
                self.io = io;
            }
            "use_special_vars" => self.emit_special_vars(),
            "define" => self.parse_define(start)?,
            _ => {
                return Err(
                    self.error_at(start, format!("unknown preprocessor directive '~{name}'"))
                )
            }
        }
        self.skip_line();
        Ok(())
    }

    fn parse_define(&mut self, start: usize) -> Result<(), ParseError> {
        self.skip_inline_space();
        let name_end = find_word_end(self.bytes, self.pos);
        let name = self.text(self.pos, name_end);
        self.pos = name_end;
        self.skip_inline_space();
        let value_end = find_word_end(self.bytes, self.pos);
        let value = self.text(self.pos, value_end);
        self.pos = value_end;
        if name.is_empty() || value.is_empty() {
            return Err(self.error_at(start, "'~define' expects a name and a value"));
        }
        if self.defines.contains_key(&name) {
            return Err(self.error_at(start, format!("alias '{name}' is already defined")));
        }
        // Chains resolve at definition time; lookups never recurse.
        let resolved = self.defines.get(&value).cloned().unwrap_or(value);
        self.defines.insert(name, resolved);
        Ok(())
    }

    /// Materialise the helper cells indexed access and for-blocks rely on:
    /// the scratch cell, the four opcode template words and the `STEP`
    /// increment. Re-issuing the directive is a no-op.
    fn emit_special_vars(&mut self) {
        if self.specials_emitted {
            return;
        }
        self.specials_emitted = true;
        let pad = self.io.pad_suffix();
        let cells: [(&str, TapeWord); 6] = [
            ("edsacc#tmp", word_of_value(0)),
            ("edsacc#add", TapeWord::Verbatim(format!("A0{pad}"))),
            ("edsacc#sub", TapeWord::Verbatim(format!("S0{pad}"))),
            ("edsacc#store", TapeWord::Verbatim(format!("T0{pad}"))),
            ("edsacc#save", TapeWord::Verbatim(format!("U0{pad}"))),
            ("STEP", word_of_value(1)),
        ];
        for (name, word) in cells {
            self.push_label(name.to_string());
            self.predicates
                .push(Predicate::Const(ConstBlock::new(vec![word])));
        }
    }

    // ----- for blocks ---------------------------------------------------

    fn parse_for(&mut self) -> Result<(), ParseError> {
        self.pos += 3;
        self.skip_space();
        let declared = self.peek() == b'$';
        if declared {
            self.pos += 1;
        }
        let var_start = self.pos;
        while self.pos < self.bytes.len()
            && !is_space(self.bytes[self.pos])
            && self.bytes[self.pos] != b'='
            && self.bytes[self.pos] != b','
        {
            self.pos += 1;
        }
        let var = self.text(var_start, self.pos);
        if var.is_empty() {
            return Err(self.error_at(var_start, "empty loop variable name"));
        }
        self.skip_space();
        let mut init = None;
        if self.peek() == b'=' {
            self.pos += 1;
            self.skip_space();
            if !self.at_int_literal() {
                return Err(self.error_here("for block initialiser must be an integer literal"));
            }
            init = Some(self.read_int());
            self.skip_space();
            if self.peek() == b'=' {
                return Err(self.error_here("duplicate initialiser in for block"));
            }
        }
        if self.peek() != b',' {
            return Err(self.error_here("expected ',' and a border after the loop variable"));
        }
        self.pos += 1;
        self.skip_space();
        let border = if self.at_int_literal() {
            Address::Literal(self.read_int())
        } else {
            let border_start = self.pos;
            while self.pos < self.bytes.len() && !is_space(self.bytes[self.pos]) {
                self.pos += 1;
            }
            let name = self.text(border_start, self.pos);
            if name.is_empty() {
                return Err(self.error_at(border_start, "empty border in for block"));
            }
            Address::Symbol(name)
        };
        self.skip_space();
        let keyword_end = find_word_end(self.bytes, self.pos);
        if &self.bytes[self.pos..keyword_end] != b"do" {
            return Err(self.error_here("expected 'do' to open the for block body"));
        }
        self.pos = keyword_end;

        let prefix = format!("edsacc#for#{}", self.for_seq);
        self.for_seq += 1;
        let pad = self.io.pad_suffix();
        if declared {
            // Jump over the loop variable's storage word.
            self.push_jump_pair(format!("{prefix}#var"));
            self.push_label(var.clone());
            self.predicates
                .push(Predicate::Const(ConstBlock::new(vec![word_of_value(0)])));
            self.push_label(format!("{prefix}#var"));
        }
        if let Some(value) = init {
            // Jump over the seed word, then move it into the variable; the
            // scratch cell preserves the accumulator across the move.
            self.push_jump_pair(format!("{prefix}#skip"));
            self.push_label(format!("{prefix}#init"));
            self.predicates
                .push(Predicate::Const(ConstBlock::new(vec![word_of_value(value)])));
            self.push_label(format!("{prefix}#skip"));
            self.push_instruction('T', Address::Symbol("edsacc#tmp".into()), pad);
            self.push_instruction('A', Address::Symbol(format!("{prefix}#init")), pad);
            self.push_instruction('T', Address::Symbol(var.clone()), pad);
            self.push_instruction('A', Address::Symbol("edsacc#tmp".into()), pad);
        }
        // Loop head: leave when var - border goes negative, otherwise undo
        // the comparison and restore the saved accumulator.
        self.push_instruction('T', Address::Symbol("edsacc#tmp".into()), pad);
        self.push_label(format!("{prefix}#redo"));
        self.push_instruction('A', Address::Symbol(var.clone()), pad);
        self.push_instruction('S', border.clone(), pad);
        self.push_instruction('G', Address::Symbol(format!("{prefix}#end")), pad);
        self.push_instruction('A', border, pad);
        self.push_instruction('S', Address::Symbol(var.clone()), pad);
        self.push_instruction('A', Address::Symbol("edsacc#tmp".into()), pad);
        self.for_stack.push(ForFrame { prefix, var });
        Ok(())
    }

    fn parse_loop_jump(&mut self, keyword: &str) -> Result<(), ParseError> {
        let prefix = match self.for_stack.last() {
            Some(frame) => frame.prefix.clone(),
            None => return Err(self.error_here(format!("'{keyword}' outside of a for block"))),
        };
        self.pos += keyword.len();
        let target = match keyword {
            "redo" => "redo",
            "break" => "end",
            _ => "cont",
        };
        self.push_jump_pair(format!("{prefix}#{target}"));
        Ok(())
    }

    fn parse_loop_end(&mut self) -> Result<(), ParseError> {
        let Some(frame) = self.for_stack.pop() else {
            return Err(self.error_here("'end' outside of a for block"));
        };
        self.pos += 3;
        let pad = self.io.pad_suffix();
        self.push_label(format!("{}#cont", frame.prefix));
        self.push_instruction('T', Address::Symbol("edsacc#tmp".into()), pad);
        self.push_instruction('A', Address::Symbol(frame.var.clone()), pad);
        self.push_instruction('A', Address::Symbol("STEP".into()), pad);
        self.push_instruction('T', Address::Symbol(frame.var), pad);
        self.push_jump_pair(format!("{}#redo", frame.prefix));
        self.push_label(format!("{}#end", frame.prefix));
        Ok(())
    }

    // ----- fallback -----------------------------------------------------

    fn push_raw_word(&mut self) {
        let end = find_word_end(self.bytes, self.pos);
        let word = self.text(self.pos, end);
        let (line, col) = line_col(self.bytes, self.pos);
        self.diagnostics.push(Diagnostic::parse_warning(
            line,
            col,
            format!("not parsable word \"{word}\""),
        ));
        self.predicates.push(Predicate::RawText(word));
        self.pos = end;
    }

    // ----- comments -----------------------------------------------------

    fn skip_line(&mut self) {
        while self.pos < self.bytes.len()
            && self.bytes[self.pos] != b'\r'
            && self.bytes[self.pos] != b'\n'
        {
            self.pos += 1;
        }
        if self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            self.pos += 1;
            if c == b'\r' && self.peek() == b'\n' {
                self.pos += 1;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        loop {
            if self.pos >= self.bytes.len() {
                return Err(self.error_at(start, "multiline comment not closed"));
            }
            if self.bytes[self.pos] == b'*' && self.at(self.pos + 1) == b'/' {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn skip_edsac_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b']' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(self.error_at(start, "edsac comment not closed"));
        }
        self.pos += 1;
        Ok(())
    }

    // ----- cursor helpers -----------------------------------------------

    fn at(&self, pos: usize) -> u8 {
        self.bytes.get(pos).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.at(self.pos)
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.bytes[start..end]).into_owned()
    }

    fn skip_space(&mut self) {
        while is_space(self.peek()) {
            self.pos += 1;
        }
    }

    fn skip_inline_space(&mut self) {
        while self.peek() == b' ' || self.peek() == b'\t' {
            self.pos += 1;
        }
    }

    fn at_int_literal(&self) -> bool {
        is_digit(self.peek()) || (self.peek() == b'-' && is_digit(self.at(self.pos + 1)))
    }

    fn read_int(&mut self) -> i32 {
        let mut negative = false;
        if self.peek() == b'-' {
            negative = true;
            self.pos += 1;
        }
        let mut value: i32 = 0;
        while is_digit(self.peek()) {
            value = value
                .wrapping_mul(10)
                .wrapping_add((self.peek() - b'0') as i32);
            self.pos += 1;
        }
        if negative {
            value.wrapping_neg()
        } else {
            value
        }
    }

    fn find_closing(&self, from: usize, close: u8) -> Result<usize, ParseError> {
        let mut i = from;
        while i < self.bytes.len() {
            if self.bytes[i] == close {
                return Ok(i);
            }
            i += 1;
        }
        Err(self.error_at(
            from,
            format!("EOF reached, can't find closing bracket '{}'", close as char),
        ))
    }

    fn take_suffix(&mut self) -> Result<char, ParseError> {
        let suffix = self.peek();
        if suffix == 0 || is_space(suffix) {
            return Err(self.error_here("missing instruction suffix"));
        }
        self.pos += 1;
        Ok(suffix as char)
    }

    fn push_label(&mut self, name: String) {
        self.predicates
            .push(Predicate::Label(LabelDef { name, bias: 0 }));
    }

    fn push_instruction(&mut self, opcode: char, address: Address, suffix: char) {
        self.predicates.push(Predicate::Command(Command::new(
            opcode,
            address,
            false,
            suffix,
            CommandKind::Instruction,
        )));
    }

    /// An `E`/`G` pair to the same target jumps whatever the accumulator's
    /// sign is.
    fn push_jump_pair(&mut self, target: String) {
        let pad = self.io.pad_suffix();
        self.push_instruction('E', Address::Symbol(target.clone()), pad);
        self.push_instruction('G', Address::Symbol(target), pad);
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let (line, col) = line_col(self.bytes, pos);
        ParseError::new(line, col, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseOutcome {
        Parser::new(source, InitialOrders::Two)
            .parse()
            .expect("parse")
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source, InitialOrders::Two)
            .parse()
            .err()
            .expect("parse error")
    }

    fn command_at(outcome: &ParseOutcome, idx: usize) -> &Command {
        match &outcome.program.predicates[idx] {
            Predicate::Command(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn instruction_forms() {
        let outcome = parse("T  5 F\nTF\nA x #D\nA -5 F");
        let t5 = command_at(&outcome, 0);
        assert_eq!((t5.opcode, t5.suffix), ('T', 'F'));
        assert_eq!(t5.address, Address::Literal(5));

        let tf = command_at(&outcome, 1);
        assert_eq!(tf.address, Address::Literal(0));
        assert_eq!(tf.suffix, 'F');

        let long = command_at(&outcome, 2);
        assert_eq!(long.address, Address::Symbol("x".into()));
        assert!(long.long);
        assert_eq!(long.suffix, 'D');

        let neg = command_at(&outcome, 3);
        assert_eq!(neg.address, Address::Literal(-5));
    }

    #[test]
    fn directive_classification_is_io2_only() {
        let outcome = parse("GK");
        assert_eq!(command_at(&outcome, 0).kind, CommandKind::Directive);

        let outcome = Parser::new("~io 1\nGK", InitialOrders::Two)
            .parse()
            .expect("parse");
        assert_eq!(command_at(&outcome, 0).kind, CommandKind::Instruction);
    }

    #[test]
    fn long_flag_is_not_consumed_under_io1() {
        let outcome = Parser::new("~io 1\nA 5 #", InitialOrders::Two)
            .parse()
            .expect("parse");
        // Under Initial Orders 1 the `#` becomes the suffix letter.
        assert_eq!(command_at(&outcome, 0).suffix, '#');
        assert!(!command_at(&outcome, 0).long);
    }

    #[test]
    fn missing_suffix_is_positioned() {
        let err = parse_err("T 5");
        assert_eq!((err.line, err.col), (1, 4));
        assert_eq!(err.message, "missing instruction suffix");
    }

    #[test]
    fn label_forms_define_once() {
        let outcome = parse(":a:\nb:\n$c = 0 s");
        let names: Vec<_> = outcome
            .program
            .predicates
            .iter()
            .filter_map(|p| match p {
                Predicate::Label(label) => Some(label.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn label_with_leading_space_fails() {
        let err = parse_err(": x:");
        assert_eq!(
            err.message,
            "unexpected space character before variable name"
        );
        let err = parse_err("$ x = 0 s");
        assert_eq!(
            err.message,
            "unexpected space character before variable name"
        );
    }

    #[test]
    fn unterminated_label_reaches_eof() {
        let err = parse_err(":abc");
        assert_eq!(err.message, "EOF reached, can't find character ':'");
    }

    #[test]
    fn dollar_label_requires_a_constant() {
        let err = parse_err("$x T 5 F");
        assert_eq!(err.message, "expected a constant definition after the label");
    }

    #[test]
    fn two_word_constant_biases_its_label() {
        let outcome = parse("$x = 5 l");
        match &outcome.program.predicates[0] {
            Predicate::Label(label) => assert_eq!(label.bias, 1),
            other => panic!("expected label, got {other:?}"),
        }
        match &outcome.program.predicates[1] {
            Predicate::Const(block) => assert_eq!(block.words.len(), 2),
            other => panic!("expected const block, got {other:?}"),
        }
    }

    #[test]
    fn tight_and_spaced_width_markers_agree() {
        let a = parse("$x = 3s");
        let b = parse("$x = 3 s");
        match (&a.program.predicates[1], &b.program.predicates[1]) {
            (Predicate::Const(left), Predicate::Const(right)) => {
                assert_eq!(left.words, right.words)
            }
            other => panic!("expected const blocks, got {other:?}"),
        }
    }

    #[test]
    fn junk_after_constant_fails() {
        let err = parse_err("$x = 3x");
        assert_eq!(err.message, "unexpected character in constant literal 'x'");
    }

    #[test]
    fn array_reserve_fills_with_literal_ps() {
        let outcome = parse("$a = [3]{1s}");
        assert!(matches!(
            outcome.program.predicates[1],
            Predicate::ArrayPointer(_)
        ));
        match &outcome.program.predicates[2] {
            Predicate::Const(block) => {
                assert_eq!(block.words.len(), 3);
                assert_eq!(block.words[1], TapeWord::Verbatim("PS".into()));
                assert_eq!(block.words[2], TapeWord::Verbatim("PS".into()));
            }
            other => panic!("expected const block, got {other:?}"),
        }
    }

    #[test]
    fn array_overflow_fails() {
        let err = parse_err("$a = [1]{1s,2s}");
        assert_eq!(
            err.message,
            "allocated number 1 lower than the 2 elements initialized"
        );
    }

    #[test]
    fn array_with_long_element_counts_two_slots() {
        let outcome = parse("$a = [3]{5l,1s}");
        match &outcome.program.predicates[2] {
            Predicate::Const(block) => assert_eq!(block.words.len(), 3),
            other => panic!("expected const block, got {other:?}"),
        }
    }

    #[test]
    fn array_rejects_non_literals() {
        let err = parse_err("$a = {x}");
        assert_eq!(
            err.message,
            "unexpected character in array initialization block 'x'"
        );
    }

    #[test]
    fn const_call_requires_two_parameters() {
        let err = parse_err("CONST(5)");
        assert_eq!(
            err.message,
            "function CONST(int n, char postfix) expects 2 parameters"
        );
        let err = parse_err("CONST(5, F junk)");
        assert_eq!(err.message, "closing bracket expected");
    }

    #[test]
    fn io_directive_must_come_first() {
        let err = parse_err("T 5 F\n~io 1");
        assert_eq!(err.message, "'~io' must appear before any code");
        assert_eq!((err.line, err.col), (2, 1));

        let err = parse_err("~io 3");
        assert_eq!(err.message, "unsupported specification: Initial Orders 3");
    }

    #[test]
    fn unknown_directive_fails() {
        let err = parse_err("~nope");
        assert_eq!(err.message, "unknown preprocessor directive '~nope'");
    }

    #[test]
    fn defines_resolve_transitively_and_reject_redefinition() {
        let outcome = parse("~define A 5\n~define B A");
        assert_eq!(outcome.defines.get("A").map(String::as_str), Some("5"));
        assert_eq!(outcome.defines.get("B").map(String::as_str), Some("5"));

        let err = parse_err("~define A 1\n~define A 2");
        assert_eq!(err.message, "alias 'A' is already defined");
    }

    #[test]
    fn special_vars_are_emitted_once() {
        let once = parse("~use_special_vars");
        let twice = parse("~use_special_vars\n~use_special_vars");
        assert_eq!(
            once.program.predicates.len(),
            twice.program.predicates.len()
        );
        assert_eq!(once.program.predicates.len(), 12);
    }

    #[test]
    fn indexing_rejects_unsupported_opcodes() {
        let err = parse_err("E arr[0] F");
        assert_eq!(err.message, "operation 'E' does not support indexing");
    }

    #[test]
    fn indexing_with_long_flag_warns() {
        let outcome = parse("A arr[0] #F");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0]
            .message
            .contains("long operand ignored"));
    }

    #[test]
    fn loop_controls_outside_a_block_fail() {
        assert_eq!(
            parse_err("break x").message,
            "'break' outside of a for block"
        );
        assert_eq!(parse_err("end").message, "'end' outside of a for block");
    }

    #[test]
    fn unclosed_for_block_fails_at_eof() {
        let err = parse_err("for $i, 3 do\nredo");
        assert_eq!(err.message, "for block over 'i' is not closed with 'end'");
    }

    #[test]
    fn for_header_errors() {
        assert_eq!(
            parse_err("for i 3 do").message,
            "expected ',' and a border after the loop variable"
        );
        assert_eq!(
            parse_err("for i=1=2, 3 do").message,
            "duplicate initialiser in for block"
        );
        assert_eq!(
            parse_err("for i, 3 go").message,
            "expected 'do' to open the for block body"
        );
    }

    #[test]
    fn unterminated_comments_fail_with_position() {
        let err = parse_err("/* open");
        assert_eq!(err.message, "multiline comment not closed");
        let err = parse_err("[ open");
        assert_eq!(err.message, "edsac comment not closed");
    }

    #[test]
    fn raw_words_warn_and_pass_through() {
        let outcome = parse("T 5 F\nwat");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].to_string(),
            "warning:2:1: not parsable word \"wat\""
        );
        assert!(matches!(
            outcome.program.predicates[1],
            Predicate::RawText(ref text) if text == "wat"
        ));
    }

    #[test]
    fn comments_are_skipped() {
        let outcome = parse("// line\n/* block\nstill */ [ edsac ] T 5 F");
        assert_eq!(outcome.program.predicates.len(), 1);
        assert!(outcome.diagnostics.is_empty());
    }
}
