// src/hexfmt.rs
//! Hex input and the three output layouts the harness prints:
//! labelled rows, 16-per-line bulk dumps and indented register dumps.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::error::HarnessError;

/// Decodes a command-line hex argument. Whitespace is ignored; an empty
/// string is an empty byte string.
pub fn parse_hex_arg(s: &str) -> Result<Vec<u8>, HarnessError> {
    let compact: String = s.split_whitespace().collect();
    Ok(hex::decode(compact)?)
}

/// `label` right-aligned in 14 columns, then ` xx` per byte. A new
/// indented row starts whenever 19 bytes remain modulo 20.
#[must_use]
pub fn format_labelled(label: &str, bytes: &[u8]) -> String {
    let mut out = format!("{label:>14}:");
    let mut remaining = bytes.len();
    for b in bytes {
        remaining -= 1;
        if remaining % 20 == 19 {
            out.push('\n');
            out.push_str(&" ".repeat(15));
        }
        let _ = write!(out, " {b:02x}");
    }
    out
}

/// Writes `bytes` as two-digit hex, 16 per line.
pub fn write_bulk<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    for (i, b) in bytes.iter().enumerate() {
        let sep = if i % 16 == 15 { '\n' } else { ' ' };
        write!(w, "{b:02x}{sep}")?;
    }
    if bytes.len() % 16 != 0 {
        writeln!(w)?;
    }
    Ok(())
}

/// Register words one per line, each indented four columns deeper.
#[must_use]
pub fn format_register(label: &str, words: &[u32]) -> String {
    let mut out = format!("{label}\n");
    for (i, w) in words.iter().enumerate() {
        let _ = writeln!(out, "{:indent$}{w:08x}", "", indent = i * 4);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_spaced_hex() {
        assert_eq!(parse_hex_arg("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert_eq!(parse_hex_arg("de ad").unwrap(), vec![0xde, 0xad]);
        assert!(parse_hex_arg("").unwrap().is_empty());
        assert!(matches!(parse_hex_arg("abc"), Err(HarnessError::Hex(_))));
    }

    #[test]
    fn labelled_short_row() {
        assert_eq!(format_labelled("key", &[1, 2, 0xab]), "           key: 01 02 ab");
    }

    #[test]
    fn labelled_twenty_bytes_start_on_continuation_row() {
        let s = format_labelled("one chunk", &[0u8; 20]);
        let mut lines = s.lines();
        assert_eq!(lines.next(), Some("     one chunk:"));
        let row = lines.next().unwrap();
        assert!(row.starts_with(&" ".repeat(15)));
        assert_eq!(row.split_whitespace().count(), 20);
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn bulk_wraps_at_sixteen() {
        let mut out = Vec::new();
        write_bulk(&mut out, &(0u8..18).collect::<Vec<_>>()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f\n10 11 \n"
        );

        let mut exact = Vec::new();
        write_bulk(&mut exact, &[0xffu8; 16]).unwrap();
        assert!(String::from_utf8(exact).unwrap().ends_with("ff\n"));
    }

    #[test]
    fn register_dump_indents() {
        let s = format_register("R", &[0x1, 0xdeadbeef]);
        assert_eq!(s, "R\n00000001\n    deadbeef\n");
    }
}
