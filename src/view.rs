//! The non-disassembly views: file header, section headers, symbol table.
//!
//! These render straight from `BinaryMetadata` and still run when the
//! architecture gate skips disassembly.

use std::io::{self, Write};

use crate::theme::{Role, Theme};
use crate::BinaryMetadata;

/// Width every heading rule is padded out to.
const HEADING_WIDTH: usize = 116;

/// Print a `---[ Title ]---...` heading line.
pub fn print_heading(out: &mut dyn Write, title: &str, theme: &Theme) -> io::Result<()> {
    write!(out, "\n{}---[ {} ]", theme.escape(Role::Header), title)?;
    for _ in 0..HEADING_WIDTH.saturating_sub(title.len()) {
        write!(out, "-")?;
    }
    writeln!(out, "{}\n", theme.escape(Role::Reset))
}

/// Print the file header summary.
pub fn print_header(out: &mut dyn Write, meta: &BinaryMetadata, theme: &Theme) -> io::Result<()> {
    let legend = theme.escape(Role::Legend);
    let reset = theme.escape(Role::Reset);

    writeln!(out, "{legend}{:<16}{reset}{}", "Architecture:", meta.architecture)?;
    match meta.entry_point {
        Some(entry) => writeln!(
            out,
            "{legend}{:<16}{reset}{}{entry:#x}{}",
            "Entry point:",
            theme.escape(Role::Address),
            reset
        )?,
        None => writeln!(out, "{legend}{:<16}{reset}-", "Entry point:")?,
    }
    writeln!(out, "{legend}{:<16}{reset}{}", "Sections:", meta.sections.len())?;
    writeln!(out, "{legend}{:<16}{reset}{}", "Symbols:", meta.symbols.len())
}

/// Print the section header table.
pub fn print_sections(out: &mut dyn Write, meta: &BinaryMetadata, theme: &Theme) -> io::Result<()> {
    writeln!(
        out,
        "{}{:>4} {:<24} {:>12} {:>10} {:>8} {:>5}{}",
        theme.escape(Role::Legend),
        "Idx",
        "Name",
        "Address",
        "Offset",
        "Size",
        "Flags",
        theme.escape(Role::Reset),
    )?;

    for (index, section) in meta.sections.iter().enumerate() {
        writeln!(
            out,
            "{:>4} {:<24} {}{:>12x}{} {:>10x} {:>8x} {:>5}",
            index,
            section.name,
            theme.escape(Role::Address),
            section.addr,
            theme.escape(Role::Reset),
            section.offset,
            section.size,
            if section.executable { "X" } else { "" },
        )?;
    }
    Ok(())
}

/// Print the symbol table, sorted by address.
pub fn print_symbols(out: &mut dyn Write, meta: &BinaryMetadata, theme: &Theme) -> io::Result<()> {
    writeln!(
        out,
        "{}{:>12} {}{}",
        theme.escape(Role::Legend),
        "Address",
        "Name",
        theme.escape(Role::Reset),
    )?;

    for (addr, name) in &meta.symbols {
        writeln!(
            out,
            "{}{:>12x}{} {}{}{}",
            theme.escape(Role::Address),
            addr,
            theme.escape(Role::Reset),
            theme.escape(Role::Symbol),
            name,
            theme.escape(Role::Reset),
        )?;
    }
    Ok(())
}
