//! Line formatters for the disassembly view.

mod json;

pub use self::json::JsonLinesFormatter;

use std::collections::VecDeque;
use std::fmt;

use clap::ValueEnum;

use crate::resolve::NameResolver;
use crate::theme::{Role, Theme};
use crate::{Address, DisassemblyError, Insn, Section};

/// Supported output formats for the disassembly view
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colorized text output (default)
    Text,
    /// JSON Lines format (one JSON object per line)
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl OutputFormat {
    /// Get a formatter for this output format
    pub fn formatter(&self) -> Box<dyn LineFormatter> {
        match self {
            OutputFormat::Text => Box::new(AsmFormatter),
            OutputFormat::Json => Box::new(JsonLinesFormatter),
        }
    }
}

/// Renders one decoded instruction (and region headers) as text.
///
/// The renderer hands each formatter call the bounded history window, the
/// current and next addresses, the file-offset-to-vaddr correction, the
/// display base, and the name resolver and color theme capabilities; the
/// formatter owns everything about how a line looks.
pub trait LineFormatter {
    /// The header line introducing one executable region.
    fn section_header(&self, index: usize, section: &Section, theme: &Theme) -> String;

    /// One rendered instruction; may span multiple text lines (a label line
    /// followed by the instruction line). No trailing newline.
    #[allow(clippy::too_many_arguments)]
    fn line(
        &self,
        insn: &Insn,
        history: &VecDeque<Insn>,
        at: Address,
        next: Address,
        pc_offset: i64,
        display_base: Address,
        resolver: &NameResolver,
        theme: &Theme,
    ) -> Result<String, DisassemblyError>;
}

/// The default colorized, objdump-flavored text formatter.
pub struct AsmFormatter;

impl LineFormatter for AsmFormatter {
    fn section_header(&self, index: usize, section: &Section, theme: &Theme) -> String {
        format!(
            "{}Section[{:2}] {:<111}{}",
            theme.escape(Role::Title),
            index,
            section.name,
            theme.escape(Role::Reset),
        )
    }

    fn line(
        &self,
        insn: &Insn,
        history: &VecDeque<Insn>,
        at: Address,
        _next: Address,
        pc_offset: i64,
        display_base: Address,
        resolver: &NameResolver,
        theme: &Theme,
    ) -> Result<String, DisassemblyError> {
        let vaddr = (at as i64 - pc_offset) as Address;
        let mut out = String::new();

        // A named address opens its own label line.
        if let Some(name) = resolver.resolve(vaddr) {
            out.push_str(&format!(
                "{}{}:{}\n",
                theme.escape(Role::Location),
                name,
                theme.escape(Role::Reset),
            ));
        }

        let bytes_hex = insn
            .bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");

        let (operands, note) = match insn.displacement {
            Some(disp) => {
                let target = (vaddr as i64 + disp) as Address;
                let note = resolver
                    .resolve(target)
                    .map(|name| {
                        format!(
                            " <{}{}{}>",
                            theme.escape(Role::Symbol),
                            name,
                            theme.escape(Role::Reset),
                        )
                    })
                    .unwrap_or_default();
                (rewrite_target(&insn.operands, target), note)
            }
            None => {
                let note = context_hint(insn, history, pc_offset, display_base, resolver)
                    .unwrap_or_default();
                (insn.operands.clone(), note)
            }
        };

        out.push_str(&format!(
            "{}{:8x}:{}  {:<21} {}{:<8}{} {}{}",
            theme.escape(Role::Address),
            vaddr,
            theme.escape(Role::Reset),
            bytes_hex,
            theme.escape(Role::Opcode),
            insn.mnemonic,
            theme.escape(Role::Reset),
            operands,
            note,
        ));

        Ok(out.trim_end().to_string())
    }
}

/// Replace the target Capstone printed (file-offset space) with the virtual
/// address the rest of the line speaks in.
fn rewrite_target(operands: &str, target: Address) -> String {
    if let Some(idx) = operands.find("0x") {
        let rest = &operands[idx + 2..];
        let end = rest
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(rest.len());
        format!("{}{:#x}{}", &operands[..idx], target, &rest[end..])
    } else {
        operands.to_string()
    }
}

/// Context-dependent annotations that need the history window or the
/// display base: `auipc`+`addi`/`jalr` pairs and global-pointer-relative
/// accesses both name an absolute address the single instruction does not.
fn context_hint(
    insn: &Insn,
    history: &VecDeque<Insn>,
    pc_offset: i64,
    display_base: Address,
    resolver: &NameResolver,
) -> Option<String> {
    let absolute = if insn.mnemonic == "addi" || insn.mnemonic == "jalr" {
        // The history window holds the current instruction last; its
        // predecessor may be the auipc that staged the upper bits.
        let prev = history.iter().rev().nth(1)?;
        if prev.mnemonic != "auipc" {
            return None;
        }
        let hi = last_immediate(&prev.operands)?;
        let lo = last_immediate(&insn.operands)?;
        let prev_vaddr = prev.addr as i64 - pc_offset;
        (prev_vaddr + (hi << 12) + lo) as Address
    } else if let Some(idx) = insn.operands.find("(gp)") {
        if display_base == 0 {
            return None;
        }
        let imm = parse_immediate(insn.operands[..idx].rsplit([' ', ',']).next()?)?;
        (display_base as i64 + imm) as Address
    } else {
        return None;
    };

    let name = resolver
        .resolve(absolute)
        .map(|n| format!(" <{n}>"))
        .unwrap_or_default();
    Some(format!("\t# {absolute:#x}{name}"))
}

/// The last comma-separated operand, as a signed immediate, if it is one.
fn last_immediate(operands: &str) -> Option<i64> {
    parse_immediate(operands.rsplit(',').next()?.trim())
}

fn parse_immediate(token: &str) -> Option<i64> {
    let token = token.trim();
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = if let Some(hex) = token.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        token.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}
