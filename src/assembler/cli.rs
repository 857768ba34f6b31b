// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::words::InitialOrders;

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "EDSAC assembler.

Reads a program in the extended EDSAC assembly dialect and writes the
instruction tape text consumed by EDSAC simulators, following either the
\"Initial Orders 1\" or \"Initial Orders 2\" loader conventions (default 2).
Without --input/--output the program is read from stdin and the tape is
written to stdout.";

#[derive(Parser, Debug)]
#[command(
    name = "edsacc",
    version = VERSION,
    about = "EDSAC assembler producing Initial Orders 1/2 instruction tapes",
    long_about = LONG_ABOUT,
    disable_version_flag = true
)]
pub struct Cli {
    #[arg(
        short = '1',
        action = ArgAction::SetTrue,
        overrides_with = "io_2",
        long_help = "Specify \"Initial Orders 1\" for the program."
    )]
    pub io_1: bool,
    #[arg(
        short = '2',
        action = ArgAction::SetTrue,
        overrides_with = "io_1",
        long_help = "Specify \"Initial Orders 2\" for the program (default)."
    )]
    pub io_2: bool,
    #[arg(
        long = "io",
        value_name = "VERSION",
        long_help = "Specify the Initial Orders version (1 or 2). The -1/-2 short flags take precedence."
    )]
    pub io: Option<i32>,
    #[arg(
        long = "input",
        value_name = "FILE",
        long_help = "Program file to translate. Standard input is used when omitted."
    )]
    pub input: Option<PathBuf>,
    #[arg(
        long = "output",
        value_name = "FILE",
        long_help = "Destination for the translated tape. Standard output is used when omitted."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        long_help = "Annotate every emitted unit with its kind and address and append a symbol table dump, all as bracketed EDSAC comments."
    )]
    pub debug: bool,
}

/// Resolve the Initial Orders selection from the flags. The `-1`/`-2`
/// shorthands win over `--io`; the later of the two shorthands wins
/// (clap's `overrides_with` keeps only the last).
pub fn initial_orders(cli: &Cli) -> Result<InitialOrders, AsmError> {
    if cli.io_1 {
        return Ok(InitialOrders::One);
    }
    if cli.io_2 {
        return Ok(InitialOrders::Two);
    }
    match cli.io {
        None => Ok(InitialOrders::Two),
        Some(version) => InitialOrders::from_number(version).ok_or_else(|| {
            AsmError::new(
                AsmErrorKind::Cli,
                format!("unsupported specification: Initial Orders {version}"),
            )
        }),
    }
}
