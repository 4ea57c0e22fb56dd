//! Test-only helpers: a fixed-width mock ISA so the passes can be
//! exercised without Capstone, plus an ELF synthesizer for parser tests.

use crate::{Address, Architecture, BinaryMetadata, Decoder, Insn, InsnClass, Section, MAX_INSTRUCTION_SIZE};

/// A decoder for a toy fixed-width ISA: every instruction is four bytes,
/// byte 0 selects the operation and bytes 2..4 hold a little-endian i16
/// displacement.
///
/// Opcodes: 0x00 nop, 0x01 beq (conditional branch), 0x02 jmp
/// (unconditional jump), 0x03 ret.
pub(crate) struct TestDecoder(pub Architecture);

impl Decoder for TestDecoder {
    fn decode(&self, image: &[u8], at: Address) -> Option<Insn> {
        let offset = at as usize;
        if offset + 4 > image.len() {
            return None;
        }
        let w = &image[offset..offset + 4];
        let disp = i16::from_le_bytes([w[2], w[3]]) as i64;
        let target = at as i64 + disp;

        let (mnemonic, operands, class, displacement) = match w[0] {
            0x01 => ("beq", format!("{target:#x}"), InsnClass::Branch, Some(disp)),
            0x02 => ("jmp", format!("{target:#x}"), InsnClass::Jump, Some(disp)),
            0x03 => ("ret", String::new(), InsnClass::Return, None),
            _ => ("nop", String::new(), InsnClass::Other, None),
        };

        let mut bytes = [0u8; MAX_INSTRUCTION_SIZE];
        bytes[..4].copy_from_slice(w);

        Some(Insn {
            addr: at,
            size: 4,
            mnemonic: mnemonic.to_string(),
            operands,
            bytes,
            class,
            displacement,
        })
    }

    fn architecture(&self) -> Architecture {
        self.0
    }
}

/// Encode one toy instruction.
pub(crate) fn word(op: u8, disp: i16) -> [u8; 4] {
    let d = disp.to_le_bytes();
    [op, 0, d[0], d[1]]
}

/// Build an `Insn` by hand for formatter tests.
pub(crate) fn insn(
    addr: Address,
    mnemonic: &str,
    operands: &str,
    class: InsnClass,
    displacement: Option<i64>,
) -> Insn {
    Insn {
        addr,
        size: 4,
        mnemonic: mnemonic.to_string(),
        operands: operands.to_string(),
        bytes: [0; MAX_INSTRUCTION_SIZE],
        class,
        displacement,
    }
}

/// Metadata with the given sections and an empty symbol table.
pub(crate) fn meta_with_sections(arch: Architecture, sections: Vec<Section>) -> BinaryMetadata {
    let mut meta = BinaryMetadata::default_raw();
    meta.architecture = arch;
    meta.sections = sections;
    meta
}

/// Write a minimal relocatable x86-64 ELF with the given `.text` contents
/// and symbols (name, offset-into-.text pairs).
pub(crate) fn write_elf_x86_64(code: &[u8], symbols: &[(&str, u64)]) -> Vec<u8> {
    use object::write::{Object, StandardSegment, Symbol, SymbolSection};
    use object::{Architecture as ObjArch, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

    let mut obj = Object::new(BinaryFormat::Elf, ObjArch::X86_64, Endianness::Little);
    let text = obj.add_section(
        obj.segment_name(StandardSegment::Text).to_vec(),
        b".text".to_vec(),
        SectionKind::Text,
    );
    obj.append_section_data(text, code, 16);

    for (name, value) in symbols {
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: *value,
            size: 0,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }

    obj.write().expect("ELF synthesis failed")
}
