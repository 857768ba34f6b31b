// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! EDSAC assembler - main entry point.
//!
//! Reads the whole source, runs the front end, the layout and resolution
//! passes, and streams the tape text to the selected output. Warnings are
//! collected into the run report; a fatal error carries the warnings
//! gathered before it so the caller can print both.

pub mod cli;

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};

use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser as ClapParser;

use crate::core::error::{AsmError, AsmErrorKind, Diagnostic, RunError, RunReport};
use crate::core::parser::Parser;
use crate::core::program::Program;
use crate::core::symbol_table::SymbolTable;
use crate::core::words::InitialOrders;

use cli::{initial_orders, Cli};

// Re-export public types
pub use cli::VERSION;


/// Run the assembler with command-line arguments.
pub fn run() -> Result<RunReport, RunError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
            ) =>
        {
            print!("{err}");
            return Ok(RunReport::default());
        }
        Err(err) => {
            return Err(AsmError::new(AsmErrorKind::Cli, err.to_string()).into());
        }
    };
    let io = initial_orders(&cli)?;

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path).map_err(|err| {
            AsmError::new(AsmErrorKind::Io, format!("{}: {err}", path.display()))
        })?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| AsmError::new(AsmErrorKind::Io, format!("stdin: {err}")))?;
            buffer
        }
    };

    let (program, symbols, diagnostics) = translate(&source, io)?;

    match &cli.output {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                RunError::new(
                    AsmError::new(AsmErrorKind::Io, format!("{}: {err}", path.display())),
                    diagnostics.clone(),
                )
            })?;
            let mut out = BufWriter::new(file);
            write_tape(&program, &symbols, cli.debug, &mut out, &diagnostics)?;
            out.flush().map_err(|err| {
                RunError::new(
                    AsmError::new(AsmErrorKind::Io, err.to_string()),
                    diagnostics.clone(),
                )
            })?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_tape(&program, &symbols, cli.debug, &mut out, &diagnostics)?;
        }
    }

    Ok(RunReport::new(diagnostics))
}

/// Parse, lay out and resolve a source buffer. Returns the emission-ready
/// program along with the symbol table and the collected warnings.
pub fn translate(
    source: &str,
    io: InitialOrders,
) -> Result<(Program, SymbolTable, Vec<Diagnostic>), RunError> {
    let outcome = Parser::new(source, io).parse().map_err(AsmError::from)?;
    let mut program = outcome.program;
    let mut diagnostics = outcome.diagnostics;
    let symbols = program
        .layout()
        .map_err(|err| RunError::new(err.into(), diagnostics.clone()))?;
    program
        .resolve(&symbols, &mut diagnostics)
        .map_err(|err| RunError::new(err.into(), diagnostics.clone()))?;
    Ok((program, symbols, diagnostics))
}

fn write_tape<W: Write>(
    program: &Program,
    symbols: &SymbolTable,
    debug: bool,
    out: &mut W,
    diagnostics: &[Diagnostic],
) -> Result<(), RunError> {
    program.emit(out, debug, symbols).map_err(|err| {
        RunError::new(
            AsmError::new(AsmErrorKind::Io, err.to_string()),
            diagnostics.to_vec(),
        )
    })
}
