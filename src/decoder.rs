//! Capstone-based instruction decoders for multiple architectures.

use std::fmt;

use capstone::arch::arm::ArchMode as ArmMode;
use capstone::arch::arm64::ArchMode as Arm64Mode;
use capstone::arch::mips::ArchMode as MipsMode;
use capstone::arch::ppc::ArchMode as PpcMode;
use capstone::arch::riscv::ArchMode as RiscVMode;
use capstone::arch::x86::ArchMode as X86Mode;
use capstone::{prelude::BuildsCapstone, Capstone};

use crate::{Address, Architecture, Decoder, Insn, InsnClass, MAX_INSTRUCTION_SIZE};

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// Capstone error
    #[error("Capstone error: {0}")]
    CapstoneError(#[from] capstone::Error),

    /// Unsupported architecture
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(Architecture),
}

/// A Capstone-based decoder for all supported ISAs.
#[derive(Debug)]
pub enum CapstoneDecoder {
    X86_32(Capstone),
    X86_64(Capstone),
    Arm(Capstone),
    Thumb(Capstone),
    AArch64(Capstone),
    Mips32(Capstone),
    RiscV32(Capstone),
    RiscV64(Capstone),
    Ppc32(Capstone),
}

// SAFETY: Capstone's C‐API handle is thread‐safe if you never call
// `disasm_all` concurrently on the *same* handle.
unsafe impl Send for CapstoneDecoder {}
unsafe impl Sync for CapstoneDecoder {}

impl CapstoneDecoder {
    /// Create a decoder for a specific architecture
    pub fn for_architecture(arch: Architecture) -> Result<Self, DecoderError> {
        match arch {
            Architecture::X86_32 => Ok(CapstoneDecoder::X86_32(Self::build_x86_32()?)),
            Architecture::X86_64 => Ok(CapstoneDecoder::X86_64(Self::build_x86_64()?)),
            Architecture::Arm => Ok(CapstoneDecoder::Arm(Self::build_arm()?)),
            Architecture::Thumb => Ok(CapstoneDecoder::Thumb(Self::build_thumb()?)),
            Architecture::AArch64 => Ok(CapstoneDecoder::AArch64(Self::build_aarch64()?)),
            Architecture::Mips32 => Ok(CapstoneDecoder::Mips32(Self::build_mips32()?)),
            Architecture::RiscV32 => Ok(CapstoneDecoder::RiscV32(Self::build_riscv32()?)),
            Architecture::RiscV64 => Ok(CapstoneDecoder::RiscV64(Self::build_riscv64()?)),
            Architecture::Ppc32 => Ok(CapstoneDecoder::Ppc32(Self::build_ppc32()?)),
            Architecture::Unknown => Err(DecoderError::UnsupportedArchitecture(arch)),
        }
    }

    /// Build an x86 32-bit decoder
    pub fn build_x86_32() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .x86()
            .mode(X86Mode::Mode32)
            .detail(false)
            .build()?)
    }

    /// Build an x86 64-bit decoder
    pub fn build_x86_64() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .x86()
            .mode(X86Mode::Mode64)
            .detail(false)
            .build()?)
    }

    /// Build an ARM (ARM mode) decoder
    pub fn build_arm() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .arm()
            .mode(ArmMode::Arm)
            .detail(false)
            .build()?)
    }

    /// Build an ARM (Thumb mode) decoder
    pub fn build_thumb() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .arm()
            .mode(ArmMode::Thumb)
            .detail(false)
            .build()?)
    }

    /// Build an AArch64 decoder
    pub fn build_aarch64() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .arm64()
            .mode(Arm64Mode::Arm)
            .detail(false)
            .build()?)
    }

    /// Build a MIPS32 little-endian decoder
    pub fn build_mips32() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .mips()
            .mode(MipsMode::Mips32)
            .detail(false)
            .build()?)
    }

    /// Build a RISC-V 32-bit decoder
    pub fn build_riscv32() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .riscv()
            .mode(RiscVMode::RiscV32)
            .detail(false)
            .build()?)
    }

    /// Build a RISC-V 64-bit decoder
    pub fn build_riscv64() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .riscv()
            .mode(RiscVMode::RiscV64)
            .detail(false)
            .build()?)
    }

    /// Build a PPC32 decoder
    pub fn build_ppc32() -> Result<Capstone, DecoderError> {
        Ok(Capstone::new()
            .ppc()
            .mode(PpcMode::Mode32)
            .detail(false)
            .build()?)
    }

    fn cs(&self) -> &Capstone {
        match self {
            CapstoneDecoder::X86_32(cs)
            | CapstoneDecoder::X86_64(cs)
            | CapstoneDecoder::Arm(cs)
            | CapstoneDecoder::Thumb(cs)
            | CapstoneDecoder::AArch64(cs)
            | CapstoneDecoder::Mips32(cs)
            | CapstoneDecoder::RiscV32(cs)
            | CapstoneDecoder::RiscV64(cs)
            | CapstoneDecoder::Ppc32(cs) => cs,
        }
    }
}

impl fmt::Display for CapstoneDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapstoneDecoder::{}", self.architecture())
    }
}

impl Decoder for CapstoneDecoder {
    fn decode(&self, image: &[u8], at: Address) -> Option<Insn> {
        let offset = at as usize;
        if offset >= image.len() {
            return None;
        }

        // Only look at a small slice (16 bytes max)
        let end = std::cmp::min(offset + MAX_INSTRUCTION_SIZE, image.len());
        let slice = &image[offset..end];

        let decoded = self.cs().disasm_all(slice, at).ok()?;
        let i = match decoded.iter().next() {
            // Ensure the instruction starts at the address we requested
            Some(i) if i.address() == at => i,
            // Bytes that form no instruction decode to a one-byte record so
            // callers can keep walking; the decoder stays total.
            _ => return Some(raw_byte(image[offset], at)),
        };

        // Copy up to MAX_INSTRUCTION_SIZE bytes of encoding
        let mut bytes = [0u8; MAX_INSTRUCTION_SIZE];
        for (j, b) in i.bytes().iter().enumerate().take(MAX_INSTRUCTION_SIZE) {
            bytes[j] = *b;
        }

        let mnemonic = i.mnemonic().unwrap_or("").to_string();
        let operands = i.op_str().unwrap_or("").to_string();
        let class = classify(&mnemonic);
        let displacement = match class {
            InsnClass::Branch | InsnClass::Jump => {
                immediate_target(&operands).map(|t| t as i64 - at as i64)
            }
            _ => None,
        };

        Some(Insn {
            addr: i.address(),
            size: i.bytes().len() as u8,
            mnemonic,
            operands,
            bytes,
            class,
            displacement,
        })
    }

    fn architecture(&self) -> Architecture {
        match self {
            CapstoneDecoder::X86_32(_)  => Architecture::X86_32,
            CapstoneDecoder::X86_64(_)  => Architecture::X86_64,
            CapstoneDecoder::Arm(_)     => Architecture::Arm,
            CapstoneDecoder::Thumb(_)   => Architecture::Thumb,
            CapstoneDecoder::AArch64(_) => Architecture::AArch64,
            CapstoneDecoder::Mips32(_)  => Architecture::Mips32,
            CapstoneDecoder::RiscV32(_) => Architecture::RiscV32,
            CapstoneDecoder::RiscV64(_) => Architecture::RiscV64,
            CapstoneDecoder::Ppc32(_)   => Architecture::Ppc32,
        }
    }
}

fn raw_byte(byte: u8, at: Address) -> Insn {
    let mut bytes = [0u8; MAX_INSTRUCTION_SIZE];
    bytes[0] = byte;
    Insn {
        addr: at,
        size: 1,
        mnemonic: ".byte".to_string(),
        operands: format!("{byte:#04x}"),
        bytes,
        class: InsnClass::Other,
        displacement: None,
    }
}

/// Unconditional jumps with an immediate displacement, across ISAs.
const JUMPS: &[&str] = &["jmp", "ljmp", "j", "jal", "c.j", "c.jal", "b"];

/// Returns, across ISAs.
const RETURNS: &[&str] = &["ret", "retn", "retf", "retw", "c.ret", "blr", "eret"];

/// Call-like or register-indirect transfers; these never register labels.
const CALLS: &[&str] = &["call", "lcall", "jalr", "c.jalr", "c.jr", "jr", "bl", "blx", "bx", "bctr", "bctrl"];

/// Conditional branches: x86 Jcc/LOOPcc, then the beq/bne families shared by
/// RISC-V, MIPS, ARM, and PowerPC, plus compare-and-branch forms.
const BRANCHES: &[&str] = &[
    "ja", "jae", "jb", "jbe", "jc", "je", "jg", "jge", "jl", "jle", "jna", "jnae", "jnb",
    "jnbe", "jnc", "jne", "jng", "jnge", "jnl", "jnle", "jno", "jnp", "jns", "jnz", "jo",
    "jp", "jpe", "jpo", "js", "jz", "jcxz", "jecxz", "jrcxz", "loop", "loope", "loopne",
    "beq", "bne", "blt", "bge", "bltu", "bgeu", "bgt", "ble", "bgtu", "bleu", "beqz",
    "bnez", "blez", "bgez", "bltz", "bgtz", "c.beqz", "c.bnez", "cbz", "cbnz", "tbz",
    "tbnz", "bls", "bhi", "blo", "bhs", "bmi", "bpl", "bvs", "bvc", "bcc", "bcs", "bc",
    "bdnz", "bdz",
];

fn classify(mnemonic: &str) -> InsnClass {
    match mnemonic {
        m if JUMPS.contains(&m) => InsnClass::Jump,
        m if RETURNS.contains(&m) => InsnClass::Return,
        m if CALLS.contains(&m) => InsnClass::Other,
        // AArch64 writes its condition after a dot: b.eq, b.lt, ...
        m if m.starts_with("b.") => InsnClass::Branch,
        m if BRANCHES.contains(&m) => InsnClass::Branch,
        _ => InsnClass::Other,
    }
}

/// Extract the absolute target Capstone printed for a direct branch/jump.
/// Memory-indirect operands have no static target.
fn immediate_target(operands: &str) -> Option<Address> {
    if operands.contains('[') || operands.contains('(') {
        return None;
    }
    let idx = operands.find("0x")?;
    let hex = &operands[idx + 2..];
    let end = hex
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(hex.len());
    Address::from_str_radix(&hex[..end], 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_architecture_mapping() {
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_64).unwrap();
        assert_eq!(decoder.architecture(), Architecture::X86_64);
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        assert!(CapstoneDecoder::for_architecture(Architecture::Unknown).is_err());
    }

    #[test]
    fn test_x86_decode() {
        // Test decoding a simple x86 instruction (mov eax, 1)
        let bytes = [0xb8, 0x01, 0x00, 0x00, 0x00];
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_32).unwrap();

        let insn = decoder.decode(&bytes, 0).unwrap();
        assert_eq!(insn.mnemonic, "mov");
        assert_eq!(insn.size, 5);
        assert_eq!(insn.class, InsnClass::Other);
        assert_eq!(insn.displacement, None);

        // Test that we can get bytes back
        assert_eq!(insn.bytes(), &bytes);
    }

    #[test]
    fn test_x86_conditional_branch_displacement() {
        // je +8: at 0x1000 the target is 0x1008
        let bytes = [0x74, 0x06];
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_64).unwrap();

        let insn = decoder.decode(&bytes, 0x1000).unwrap();
        assert_eq!(insn.mnemonic, "je");
        assert_eq!(insn.class, InsnClass::Branch);
        assert_eq!(insn.displacement, Some(8));
    }

    #[test]
    fn test_x86_unconditional_jump_displacement() {
        // jmp +18: at 0x1000 the target is 0x1012
        let bytes = [0xeb, 0x10];
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_64).unwrap();

        let insn = decoder.decode(&bytes, 0x1000).unwrap();
        assert_eq!(insn.mnemonic, "jmp");
        assert_eq!(insn.class, InsnClass::Jump);
        assert_eq!(insn.displacement, Some(0x12));
    }

    #[test]
    fn test_undecodable_byte_is_total() {
        // 0x06 (push es) is invalid in 64-bit mode
        let bytes = [0x06];
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_64).unwrap();

        let insn = decoder.decode(&bytes, 0).unwrap();
        assert_eq!(insn.mnemonic, ".byte");
        assert_eq!(insn.size, 1);
        assert_eq!(insn.class, InsnClass::Other);
    }

    #[test]
    fn test_out_of_bounds_is_none() {
        let decoder = CapstoneDecoder::for_architecture(Architecture::X86_64).unwrap();
        assert!(decoder.decode(&[0x90], 1).is_none());
    }

    #[rstest]
    #[case("jne", InsnClass::Branch)]
    #[case("beq", InsnClass::Branch)]
    #[case("b.ge", InsnClass::Branch)]
    #[case("cbnz", InsnClass::Branch)]
    #[case("jmp", InsnClass::Jump)]
    #[case("jal", InsnClass::Jump)]
    #[case("b", InsnClass::Jump)]
    #[case("ret", InsnClass::Return)]
    #[case("blr", InsnClass::Return)]
    #[case("call", InsnClass::Other)]
    #[case("bl", InsnClass::Other)]
    #[case("jalr", InsnClass::Other)]
    #[case("mov", InsnClass::Other)]
    #[case("bswap", InsnClass::Other)]
    fn test_classify(#[case] mnemonic: &str, #[case] expected: InsnClass) {
        assert_eq!(classify(mnemonic), expected);
    }

    #[rstest]
    #[case("0x1008", Some(0x1008))]
    #[case("a0, a1, 0x1010", Some(0x1010))]
    #[case("#0x40", Some(0x40))]
    #[case("qword ptr [rip + 0x2fe5]", None)]
    #[case("8(sp)", None)]
    #[case("rax", None)]
    fn test_immediate_target(#[case] operands: &str, #[case] expected: Option<Address>) {
        assert_eq!(immediate_target(operands), expected);
    }
}
