//! Terminal color theme for the rendered views.

use std::io::IsTerminal;

/// The fixed vocabulary of semantic roles a view can colorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Header,
    Title,
    Legend,
    Opcode,
    Location,
    Address,
    Symbol,
    Reset,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Header,
        Role::Title,
        Role::Legend,
        Role::Opcode,
        Role::Location,
        Role::Address,
        Role::Symbol,
        Role::Reset,
    ];
}

/// Maps roles to ANSI escape sequences.
///
/// Every lookup re-checks both that color was requested and that stdout is
/// an interactive terminal, so the answer always reflects the current
/// output destination; nothing is cached at construction.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn escape(&self, role: Role) -> &'static str {
        if !self.color || !std::io::stdout().is_terminal() {
            return "";
        }
        escape_code(role)
    }
}

fn escape_code(role: Role) -> &'static str {
    match role {
        Role::Header => "\x1b[1;37;40m",
        Role::Title => "\x1b[1;37;40m",
        Role::Legend => "\x1b[1;35m",
        Role::Opcode => "\x1b[1;36m",
        Role::Location => "\x1b[32m",
        Role::Address => "\x1b[33m",
        Role::Symbol => "\x1b[4m",
        Role::Reset => "\x1b[0m",
    }
}
