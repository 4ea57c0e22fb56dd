//! Goblin-based multi-format binary parser.

use std::collections::BTreeMap;
use std::fmt;

use goblin::mach::{constants::cputype, Mach, MachO};
use goblin::{elf, pe, Object};

use crate::{Address, Architecture, BinaryMetadata, BinaryParser, DisassemblyError, Section};

/// A parser that handles ELF, PE, and Mach-O via Goblin.
#[derive(Debug, Default)]
pub struct GoblinParser;

impl GoblinParser {
    /// Construct a new GoblinParser.
    pub fn new() -> Self {
        GoblinParser
    }

    /// Parse an ELF image.
    fn parse_elf(&self, elf: elf::Elf, _img: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        let arch = match elf.header.e_machine {
            elf::header::EM_386       => Architecture::X86_32,
            elf::header::EM_X86_64    => Architecture::X86_64,
            elf::header::EM_ARM       => Architecture::Arm,
            elf::header::EM_AARCH64   => Architecture::AArch64,
            elf::header::EM_MIPS      => Architecture::Mips32,
            elf::header::EM_PPC       => Architecture::Ppc32,
            elf::header::EM_RISCV     => {
                // Determine RISC-V bitness from ELF class
                match elf.header.e_ident[elf::header::EI_CLASS] {
                    elf::header::ELFCLASS32 => Architecture::RiscV32,
                    elf::header::ELFCLASS64 => Architecture::RiscV64,
                    _ => Architecture::Unknown,
                }
            },
            _                         => Architecture::Unknown,
        };

        // Gather all sections
        let mut sections = Vec::new();
        for sh in &elf.section_headers {
            if let Some(name) = elf.shdr_strtab.get_at(sh.sh_name) {
                sections.push(Section::new(
                    name.to_string(),
                    sh.sh_offset,
                    sh.sh_addr,
                    sh.sh_size as usize,
                    sh.is_executable(),
                ));
            }
        }

        // Gather the symbol tables. File and section symbols carry no useful
        // address name; the first non-empty name at an address wins.
        let mut symbols = BTreeMap::new();
        for sym in elf.syms.iter() {
            if sym.st_type() == elf::sym::STT_FILE || sym.st_type() == elf::sym::STT_SECTION {
                continue;
            }
            if let Some(name) = elf.strtab.get_at(sym.st_name) {
                if !name.is_empty() {
                    symbols.entry(sym.st_value).or_insert_with(|| name.to_string());
                }
            }
        }
        for sym in elf.dynsyms.iter() {
            if sym.st_type() == elf::sym::STT_FILE || sym.st_type() == elf::sym::STT_SECTION {
                continue;
            }
            if let Some(name) = elf.dynstrtab.get_at(sym.st_name) {
                if !name.is_empty() {
                    symbols.entry(sym.st_value).or_insert_with(|| name.to_string());
                }
            }
        }

        log::debug!(
            "parsed ELF: {} sections, {} symbols, arch {}",
            sections.len(),
            symbols.len(),
            arch
        );

        Ok(BinaryMetadata {
            architecture: arch,
            entry_point:  Some(elf.entry),
            sections,
            symbols,
        })
    }

    /// Parse a PE image.
    fn parse_pe(&self, pe: pe::PE<'_>, _img: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        let arch = match pe.header.coff_header.machine {
            pe::header::COFF_MACHINE_X86    => Architecture::X86_32,
            pe::header::COFF_MACHINE_X86_64 => Architecture::X86_64,
            pe::header::COFF_MACHINE_ARM    => Architecture::Arm,
            pe::header::COFF_MACHINE_ARM64  => Architecture::AArch64,
            _                                => Architecture::Unknown,
        };

        // Gather PE sections
        let mut sections = Vec::new();
        for sect in &pe.sections {
            let name = sect.name().unwrap_or("").to_string();
            let executable = (sect.characteristics & pe::section_table::IMAGE_SCN_MEM_EXECUTE) != 0;
            sections.push(Section::new(
                name,
                sect.pointer_to_raw_data as Address,
                sect.virtual_address as Address,
                sect.virtual_size as usize,
                executable,
            ));
        }

        // Named exports are the only symbols a stripped PE reliably carries.
        let mut symbols = BTreeMap::new();
        for export in &pe.exports {
            if let Some(name) = export.name {
                if !name.is_empty() {
                    symbols.entry(export.rva as Address).or_insert_with(|| name.to_string());
                }
            }
        }

        Ok(BinaryMetadata {
            architecture: arch,
            entry_point:  Some(pe.entry as u64),
            sections,
            symbols,
        })
    }

    /// Parse a Mach-O binary
    fn parse_macho(&self, macho: &MachO) -> Result<BinaryMetadata, DisassemblyError> {
        let arch = match macho.header.cputype {
            cputype::CPU_TYPE_I386   => Architecture::X86_32,
            cputype::CPU_TYPE_X86_64 => Architecture::X86_64,
            cputype::CPU_TYPE_ARM    => Architecture::Arm,
            cputype::CPU_TYPE_ARM64  => Architecture::AArch64,
            _                        => Architecture::Unknown,
        };

        // Segment granularity is enough here; VM_PROT_EXECUTE is 0x4.
        let mut sections = Vec::new();
        for segment in &macho.segments {
            let is_executable = (segment.maxprot & 0x4) != 0;
            let name = segment.name().unwrap_or("").to_string();

            sections.push(Section::new(
                name,
                segment.fileoff as Address,
                segment.vmaddr as Address,
                segment.vmsize as usize,
                is_executable,
            ));
        }

        let mut symbols = BTreeMap::new();
        for sym in macho.symbols() {
            if let Ok((name, nlist)) = sym {
                if !name.is_empty() && nlist.n_value != 0 {
                    symbols.entry(nlist.n_value).or_insert_with(|| name.to_string());
                }
            }
        }

        Ok(BinaryMetadata {
            architecture: arch,
            entry_point: Some(macho.entry),
            sections,
            symbols,
        })
    }

    /// Parse a Mach-O image.
    fn parse_mach(&self, m: Mach<'_>, _img: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        match m {
            Mach::Binary(binary) => {
                self.parse_macho(&binary)
            },
            Mach::Fat(_) => {
                // Fat binaries would need a slice choice; report nothing rather
                // than guess.
                Ok(BinaryMetadata::default_raw())
            }
        }
    }
}

impl fmt::Display for GoblinParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoblinParser")
    }
}

impl BinaryParser for GoblinParser {
    fn parse(&self, data: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        match Object::parse(data) {
            Ok(Object::Elf(elf)) => {
                self.parse_elf(elf, data)
            },
            Ok(Object::PE(pe)) => {
                self.parse_pe(pe, data)
            },
            Ok(Object::Mach(m)) => {
                self.parse_mach(m, data)
            },
            Ok(_) => Err(DisassemblyError::ParsingError("Unsupported file format".into())),
            Err(e) => Err(DisassemblyError::ParsingError(e.to_string())),
        }
    }
}
