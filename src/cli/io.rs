//! JSON output for CLI
//!
//! Every command prints exactly one JSON document to stdout.

use std::io::{self, Write};

use serde::Serialize;

use super::errors::CliResult;

/// Write `value` as pretty JSON to stdout
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_json_to(value, &mut stdout)
}

fn write_json_to<T: Serialize, W: Write>(value: &T, writer: &mut W) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
