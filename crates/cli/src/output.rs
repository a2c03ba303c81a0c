// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of command results on stdout

use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Display;

/// `-o text` for operators, `-o json` for scripts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One value, as its `Display` form or as JSON
pub fn print<T: Serialize + Display>(value: &T, format: OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{value}");
            Ok(())
        }
        OutputFormat::Json => print_json(value),
    }
}

/// A list, one line per item in text mode or a single JSON array
pub fn print_list<T: Serialize + Display>(
    items: &[T],
    format: OutputFormat,
) -> serde_json::Result<()> {
    match format {
        OutputFormat::Text => {
            for item in items {
                println!("{item}");
            }
            Ok(())
        }
        OutputFormat::Json => print_json(items),
    }
}
