// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for edsacc.

use std::process::ExitCode;

fn main() -> ExitCode {
    match edsacc::assembler::run() {
        Ok(report) => {
            for diag in report.diagnostics() {
                eprintln!("{diag}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            for diag in err.diagnostics() {
                eprintln!("{diag}");
            }
            eprintln!("{err}");
            ExitCode::from(err.error().exit_code())
        }
    }
}
