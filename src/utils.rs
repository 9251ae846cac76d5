use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::commons::{Access, Dir, Trace};
use crate::errors::{SimError, SimResult};

/// Reads a trace file, or stdin when no path is given.
pub fn read_trace(path: Option<&Path>) -> SimResult<Trace> {
    match path {
        Some(p) => {
            info!("reading trace: {}", p.display());
            parse_trace(BufReader::new(File::open(p)?))
        }
        None => {
            info!("reading trace from stdin");
            parse_trace(io::stdin().lock())
        }
    }
}

/// Parses `<pc> <addr> <r|w>` lines. Blank lines and `#` comments are skipped.
pub fn parse_trace<R: BufRead>(reader: R) -> SimResult<Trace> {
    let mut trace = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        trace.push(parse_line(text).map_err(|reason| SimError::Trace {
            line: n + 1,
            text: text.to_string(),
            reason,
        })?);
    }
    info!("read {} trace events", trace.len());
    Ok(trace)
}

fn parse_line(text: &str) -> Result<Access, &'static str> {
    let mut parts = text.split_whitespace();
    let pc = parse_hex(parts.next().ok_or("missing pc")?).ok_or("bad pc")?;
    let addr = parse_hex(parts.next().ok_or("missing address")?).ok_or("bad address")?;
    let dir = match parts.next().ok_or("missing direction")? {
        "r" | "R" => Dir::Read,
        "w" | "W" => Dir::Write,
        _ => return Err("direction must be r or w"),
    };
    if parts.next().is_some() {
        return Err("trailing fields");
    }
    Ok(Access { pc, addr, dir })
}

fn parse_hex(s: &str) -> Option<u32> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}
