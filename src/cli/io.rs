//! Terminal I/O for CLI commands
//!
//! Output is one JSON object per line on stdout.

use std::io::{self, BufRead, Write};

use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Read one line from `reader`, without its line ending
pub fn read_line(reader: &mut impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(CliError::invalid_input("Empty input"));
    }
    Ok(line.to_string())
}

/// Write `value` as a single JSON line
pub fn write_json(writer: &mut impl Write, value: &impl Serialize) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `value` to stdout
pub fn write_stdout(value: &impl Serialize) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_json(&mut stdout, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_line_strips_newline() {
        let mut input = io::Cursor::new("s3cret pass\r\nignored\n");
        assert_eq!(read_line(&mut input).unwrap(), "s3cret pass");
    }

    #[test]
    fn test_read_line_rejects_empty() {
        let mut input = io::Cursor::new("\n");
        assert!(read_line(&mut input).is_err());
    }

    #[test]
    fn test_write_json_line() {
        let mut out = Vec::new();
        write_json(&mut out, &json!({"status": "ok"})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"status\":\"ok\"}\n");
    }
}
