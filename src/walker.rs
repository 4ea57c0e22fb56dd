//! Generic section traversal: decode, visit, advance.

use crate::{Address, Decoder, DisassemblyError, Insn};

/// Walk the instructions in `[start, end)`, invoking `visit` with each
/// decoded instruction and its current and next addresses.
///
/// Both disassembly passes run on top of this loop, so its termination
/// rules are the pipeline's termination rules: the walk ends when the next
/// address reaches `end`, and a decoder that fails to advance (or refuses
/// to decode in-bounds bytes) is a contract violation reported as
/// `DisassemblyError::DecoderContract` — never silently looped.
pub fn walk_section<F>(
    image: &[u8],
    start: Address,
    end: Address,
    decoder: &dyn Decoder,
    mut visit: F,
) -> Result<(), DisassemblyError>
where
    F: FnMut(&Insn, Address, Address) -> Result<(), DisassemblyError>,
{
    let mut at = start;
    while at < end {
        let insn = decoder
            .decode(image, at)
            .ok_or(DisassemblyError::DecoderContract(at))?;
        let next = at + insn.size as Address;
        if next <= at {
            return Err(DisassemblyError::DecoderContract(at));
        }
        visit(&insn, at, next)?;
        at = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{word, TestDecoder};
    use crate::{Architecture, InsnClass, MAX_INSTRUCTION_SIZE};

    #[test]
    fn test_walks_whole_region_in_order() {
        let mut image = Vec::new();
        image.extend_from_slice(&word(0x00, 0)); // nop
        image.extend_from_slice(&word(0x01, 8)); // beq
        image.extend_from_slice(&word(0x03, 0)); // ret

        let decoder = TestDecoder(Architecture::RiscV64);
        let mut seen = Vec::new();
        walk_section(&image, 0, image.len() as Address, &decoder, |insn, at, next| {
            seen.push((at, next, insn.class));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            seen,
            [
                (0, 4, InsnClass::Other),
                (4, 8, InsnClass::Branch),
                (8, 12, InsnClass::Return),
            ]
        );
    }

    #[test]
    fn test_empty_region_visits_nothing() {
        let image = word(0x00, 0);
        let decoder = TestDecoder(Architecture::RiscV64);
        let mut visits = 0;
        walk_section(&image, 2, 2, &decoder, |_, _, _| {
            visits += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(visits, 0);
    }

    #[test]
    fn test_non_advancing_decoder_is_fatal() {
        struct StuckDecoder;
        impl crate::Decoder for StuckDecoder {
            fn decode(&self, _image: &[u8], at: Address) -> Option<Insn> {
                Some(Insn {
                    addr: at,
                    size: 0,
                    mnemonic: "nop".to_string(),
                    operands: String::new(),
                    bytes: [0; MAX_INSTRUCTION_SIZE],
                    class: InsnClass::Other,
                    displacement: None,
                })
            }
            fn architecture(&self) -> Architecture {
                Architecture::Unknown
            }
        }

        let err = walk_section(&[0u8; 4], 0, 4, &StuckDecoder, |_, _, _| Ok(())).unwrap_err();
        assert!(matches!(err, DisassemblyError::DecoderContract(0)));
    }

    #[test]
    fn test_decode_refusal_is_fatal() {
        struct NoneDecoder;
        impl crate::Decoder for NoneDecoder {
            fn decode(&self, _image: &[u8], _at: Address) -> Option<Insn> {
                None
            }
            fn architecture(&self) -> Architecture {
                Architecture::Unknown
            }
        }

        let err = walk_section(&[0u8; 4], 0, 4, &NoneDecoder, |_, _, _| Ok(())).unwrap_err();
        assert!(matches!(err, DisassemblyError::DecoderContract(0)));
    }
}
