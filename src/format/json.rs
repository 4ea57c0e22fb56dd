//! JSON Lines output for the disassembly view.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::json;

use super::LineFormatter;
use crate::resolve::NameResolver;
use crate::theme::Theme;
use crate::{Address, DisassemblyError, Insn, Section};

/// Serializable instruction record
#[derive(Serialize)]
struct InstructionRecord<'a> {
    /// Record type, always "instruction"
    #[serde(rename = "type")]
    kind: &'static str,
    /// Virtual address of the instruction
    address: String,
    /// Size of the instruction in bytes
    size: u8,
    /// Mnemonic (e.g., "mov", "beq")
    mnemonic: &'a str,
    /// Operands
    operands: &'a str,
    /// Bytes of the instruction as hex string
    bytes: String,
    /// Control-flow class
    class: &'static str,
    /// Virtual target address, for direct branches/jumps
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    /// Resolved name of the target, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    target_name: Option<&'a str>,
    /// Resolved name of this address, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Emits one JSON object per instruction; colorless by construction.
pub struct JsonLinesFormatter;

impl LineFormatter for JsonLinesFormatter {
    fn section_header(&self, index: usize, section: &Section, _theme: &Theme) -> String {
        json!({
            "type": "section",
            "index": index,
            "name": section.name,
            "address": format!("{:#x}", section.addr),
            "size": section.size,
        })
        .to_string()
    }

    fn line(
        &self,
        insn: &Insn,
        _history: &VecDeque<Insn>,
        at: Address,
        _next: Address,
        pc_offset: i64,
        _display_base: Address,
        resolver: &NameResolver,
        _theme: &Theme,
    ) -> Result<String, DisassemblyError> {
        let vaddr = (at as i64 - pc_offset) as Address;
        let target = insn.displacement.map(|disp| (vaddr as i64 + disp) as Address);

        let record = InstructionRecord {
            kind: "instruction",
            address: format!("{vaddr:#x}"),
            size: insn.size,
            mnemonic: &insn.mnemonic,
            operands: &insn.operands,
            bytes: insn
                .bytes()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" "),
            class: insn.class.as_str(),
            target: target.map(|t| format!("{t:#x}")),
            target_name: target.and_then(|t| resolver.resolve(t)),
            name: resolver.resolve(vaddr),
        };

        serde_json::to_string(&record)
            .map_err(|e| DisassemblyError::Generic(format!("JSON serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelMap;
    use crate::testutil::insn;
    use crate::InsnClass;
    use std::collections::BTreeMap;

    #[test]
    fn test_instruction_record_fields() {
        let i = insn(0x1000, "je", "0x1008", InsnClass::Branch, Some(8));
        let history = VecDeque::from([i.clone()]);
        let symbols = BTreeMap::new();
        let mut labels = LabelMap::new();
        labels.assign(0x1008);
        let resolver = NameResolver::new(&symbols, &labels);

        let line = JsonLinesFormatter
            .line(&i, &history, 0x1000, 0x1002, 0, 0, &resolver, &Theme::new(false))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "instruction");
        assert_eq!(value["address"], "0x1000");
        assert_eq!(value["mnemonic"], "je");
        assert_eq!(value["class"], "branch");
        assert_eq!(value["target"], "0x1008");
        assert_eq!(value["target_name"], "LOC_000001");
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_section_record() {
        let section = Section::new(".text".to_string(), 0x40, 0x1000, 16, true);
        let line = JsonLinesFormatter.section_header(3, &section, &Theme::new(false));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "section");
        assert_eq!(value["index"], 3);
        assert_eq!(value["name"], ".text");
        assert_eq!(value["address"], "0x1000");
    }
}
