//! Core IR, traits, and errors for the symdis disassembly viewer.
//!
//! This library renders a symbol-aware disassembly view of the executable
//! sections in an ELF, PE, or Mach-O binary. Disassembly runs in two passes:
//! a labeling pass walks every executable section and assigns a synthetic
//! `LOC_nnnnnn` label to each branch/jump target that has no symbol, then a
//! rendering pass walks the sections again and emits one formatted line per
//! instruction with all target addresses resolved to names.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::fs;
//! use symdis::{
//!     parser::GoblinParser,
//!     decoder::CapstoneDecoder,
//!     format::AsmFormatter,
//!     render::DisasmView,
//!     theme::Theme,
//!     BinaryParser, // Import the trait to bring parse() method into scope
//! };
//!
//! // Read and parse the binary
//! let data = fs::read("path/to/binary").unwrap();
//! let meta = GoblinParser::new().parse(&data).unwrap();
//!
//! // Create a decoder for the detected architecture
//! let decoder = CapstoneDecoder::for_architecture(meta.architecture).unwrap();
//!
//! // Render the disassembly view to stdout
//! let theme = Theme::new(false);
//! let formatter = AsmFormatter;
//! let view = DisasmView::new(&decoder, &formatter, &theme);
//! view.render(&data, &meta, &mut std::io::stdout().lock()).unwrap();
//! ```

pub mod decoder;
pub mod format;
pub mod labels;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod theme;
pub mod view;
pub mod walker;

#[cfg(test)]
pub(crate) mod testutil;

use std::collections::BTreeMap;
use std::fmt;

/// Represents an address in memory
pub type Address = u64;

/// Maximum instruction size in bytes
pub const MAX_INSTRUCTION_SIZE: usize = 16;

/// How many recently decoded instructions the renderer keeps as context for
/// the line formatter. The window is a hard bound; the oldest entry is
/// evicted once it fills.
pub const HISTORY_DEPTH: usize = 8;

/// Coarse control-flow classification of a decoded instruction.
///
/// Only `Branch` and `Jump` instructions with a statically known
/// displacement take part in branch-target labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsnClass {
    /// Conditional branch with an immediate displacement
    Branch,
    /// Unconditional jump with an immediate displacement
    Jump,
    /// Return to caller
    Return,
    /// Everything else
    Other,
}

impl InsnClass {
    /// Stable lowercase name, used by the machine-readable output formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsnClass::Branch => "branch",
            InsnClass::Jump => "jump",
            InsnClass::Return => "return",
            InsnClass::Other => "other",
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// Address the instruction was decoded at (file-offset space)
    pub addr: Address,
    /// Size of the instruction in bytes
    pub size: u8,
    /// Instruction mnemonic (e.g., "mov", "beq")
    pub mnemonic: String,
    /// Instruction operands as string representation
    pub operands: String,
    /// Raw bytes of the instruction (up to MAX_INSTRUCTION_SIZE)
    pub bytes: [u8; MAX_INSTRUCTION_SIZE],
    /// Control-flow class
    pub class: InsnClass,
    /// Signed distance from `addr` to the statically encoded control-flow
    /// target, when there is one. Space-invariant: the same value applies
    /// whether addresses are file offsets or load addresses.
    pub displacement: Option<i64>,
}

impl Insn {
    /// Returns the instruction bytes, up to the actual instruction size.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.size as usize]
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.mnemonic, self.operands)
    }
}

/// Supported architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Architecture {
    /// 32-bit x86
    X86_32,
    /// 64-bit x86
    X86_64,
    /// ARM (32-bit)
    Arm,
    /// ARM Thumb mode
    Thumb,
    /// AArch64 (ARM 64-bit)
    AArch64,
    /// MIPS 32-bit
    Mips32,
    /// RISC-V 32-bit
    RiscV32,
    /// RISC-V 64-bit
    RiscV64,
    /// PowerPC 32-bit
    Ppc32,
    /// Unknown architecture
    Unknown,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_32 => write!(f, "x86-32"),
            Architecture::X86_64 => write!(f, "x86-64"),
            Architecture::Arm => write!(f, "ARM"),
            Architecture::Thumb => write!(f, "Thumb"),
            Architecture::AArch64 => write!(f, "AArch64"),
            Architecture::Mips32 => write!(f, "MIPS32"),
            Architecture::RiscV32 => write!(f, "RISC-V 32"),
            Architecture::RiscV64 => write!(f, "RISC-V 64"),
            Architecture::Ppc32 => write!(f, "PowerPC 32"),
            Architecture::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A section in the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name
    pub name: String,
    /// Starting file offset of the section contents
    pub offset: Address,
    /// Virtual load address of the section
    pub addr: Address,
    /// Size of the section in bytes
    pub size: usize,
    /// Whether this section contains executable code
    pub executable: bool,
}

impl Section {
    /// Create a new section
    pub fn new(name: String, offset: Address, addr: Address, size: usize, executable: bool) -> Self {
        Self {
            name,
            offset,
            addr,
            size,
            executable,
        }
    }

    /// Get the virtual end address of this section
    pub fn end_address(&self) -> Address {
        self.addr + self.size as Address
    }

    /// Signed correction that maps a file offset inside this section to its
    /// virtual address: `vaddr = offset - pc_offset()`.
    pub fn pc_offset(&self) -> i64 {
        self.offset as i64 - self.addr as i64
    }
}

/// Metadata describing a parsed binary.
#[derive(Debug, Clone)]
pub struct BinaryMetadata {
    /// Detected architecture
    pub architecture: Architecture,
    /// Entry point address, if available
    pub entry_point: Option<Address>,
    /// List of sections, in section-table order
    pub sections: Vec<Section>,
    /// Symbol table: virtual address to name, exact addresses only
    pub symbols: BTreeMap<Address, String>,
}

impl BinaryMetadata {
    /// Fallback metadata when no headers could be parsed.
    pub fn default_raw() -> Self {
        Self {
            architecture: Architecture::Unknown,
            entry_point: None,
            sections: Vec::new(),
            symbols: BTreeMap::new(),
        }
    }

    /// Executable sections, in section-table order.
    pub fn executable_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.executable)
    }

    /// Name of the symbol at exactly `addr`, if any.
    pub fn symbol_name(&self, addr: Address) -> Option<&str> {
        self.symbols.get(&addr).map(String::as_str)
    }

    /// Value of the symbol called `name`, if any.
    pub fn symbol_value(&self, name: &str) -> Option<Address> {
        self.symbols
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(addr, _)| *addr)
    }
}

/// Parser trait: turn raw bytes into `BinaryMetadata`.
pub trait BinaryParser: Send + Sync {
    /// Parse binary data into metadata
    ///
    /// # Arguments
    /// * `data` - The binary data to parse
    ///
    /// # Returns
    /// Result containing BinaryMetadata if parsing was successful
    fn parse(&self, data: &[u8]) -> Result<BinaryMetadata, DisassemblyError>;
}

/// Decoder trait: architecture-specific disassembler.
pub trait Decoder: Send + Sync {
    /// Decode a single instruction at `at` offset.
    ///
    /// Implementations must be deterministic and total over any byte
    /// sequence inside the image: bytes that do not form a valid
    /// instruction decode to a raw-byte record rather than `None`.
    /// `None` is reserved for out-of-bounds requests.
    fn decode(&self, image: &[u8], at: Address) -> Option<Insn>;

    /// The architecture this decoder targets, checked against the binary's
    /// architecture field before disassembly runs.
    fn architecture(&self) -> Architecture;
}

/// Error type for disassembly operations
#[derive(Debug, thiserror::Error)]
pub enum DisassemblyError {
    /// Failed to parse binary format
    #[error("Failed to parse binary format: {0}")]
    ParsingError(String),

    /// Decoder error
    #[error("Decoder error: {0}")]
    DecoderError(String),

    /// Unsupported architecture
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(Architecture),

    /// The decoder failed to advance; fatal, never silently looped
    #[error("Decoder contract violation at {0:#x}: instruction did not advance")]
    DecoderContract(Address),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}
