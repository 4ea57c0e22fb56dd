//! Branch-target labeling, the first of the two disassembly passes.
//!
//! The pass walks every executable section and registers a synthetic label
//! for the target of each conditional branch or direct jump. The rendering
//! pass later resolves those targets through the symbol table first, so a
//! synthetic label only ever shows up for addresses the binary has no name
//! for.

use std::collections::BTreeMap;

use crate::{walker, Address, BinaryMetadata, Decoder, DisassemblyError, InsnClass};

/// Synthetic labels for branch/jump targets, keyed by absolute virtual
/// address.
///
/// The sequence counter is monotonically increasing and never reset: every
/// discovered control-flow target consumes a value, including targets that
/// were already labeled (the later label overwrites the earlier one, and
/// the earlier number is simply never seen again). Label numbers in output
/// are therefore not necessarily contiguous.
#[derive(Debug, Default)]
pub struct LabelMap {
    labels: BTreeMap<Address, String>,
    counter: u64,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target`, assigning it the next label in the sequence.
    /// Overwrites any label previously assigned to the same address.
    pub fn assign(&mut self, target: Address) {
        self.counter += 1;
        self.labels.insert(target, format!("LOC_{:06}", self.counter));
    }

    /// The label for exactly `addr`, if one was assigned.
    pub fn get(&self, addr: Address) -> Option<&str> {
        self.labels.get(&addr).map(String::as_str)
    }

    /// Number of labeled addresses (not the number of counter values used).
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Run the labeling pass over every executable section of `meta`, in
/// section-table order, and return the finished map.
///
/// The full sweep runs before any rendering starts because a branch in one
/// section may target an address in another.
pub fn scan(
    image: &[u8],
    meta: &BinaryMetadata,
    decoder: &dyn Decoder,
) -> Result<LabelMap, DisassemblyError> {
    let mut labels = LabelMap::new();
    for section in meta.executable_sections() {
        let start = section.offset;
        let end = (section.offset + section.size as Address).min(image.len() as Address);
        scan_section(image, start, end, section.pc_offset(), decoder, &mut labels)?;
    }
    log::debug!("label scan complete: {} addresses labeled", labels.len());
    Ok(labels)
}

/// Label every statically known branch/jump target in `[start, end)`.
///
/// `pc_offset` is the signed correction from file offsets to the section's
/// virtual addresses; targets land in the map in virtual-address space.
/// Targets outside the section (or outside any section) are registered all
/// the same — labels are addresses, not validated against membership.
pub fn scan_section(
    image: &[u8],
    start: Address,
    end: Address,
    pc_offset: i64,
    decoder: &dyn Decoder,
    labels: &mut LabelMap,
) -> Result<(), DisassemblyError> {
    walker::walk_section(image, start, end, decoder, |insn, at, _next| {
        if matches!(insn.class, InsnClass::Branch | InsnClass::Jump) {
            if let Some(disp) = insn.displacement {
                let target = (at as i64 - pc_offset + disp) as Address;
                labels.assign(target);
            }
        }
        Ok(())
    })
}
