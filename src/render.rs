//! Disassembly rendering, the second of the two disassembly passes.

use std::collections::VecDeque;
use std::io::Write;

use crate::format::LineFormatter;
use crate::labels;
use crate::resolve::NameResolver;
use crate::theme::Theme;
use crate::walker;
use crate::{Address, BinaryMetadata, Decoder, DisassemblyError, HISTORY_DEPTH, Section};

/// Symbols whose value anchors position-relative operand rendering.
const GLOBAL_POINTER_SYMBOLS: [&str; 2] = ["_gp", "__global_pointer$"];

/// Renders the disassembly view of a parsed binary.
///
/// The full labeling sweep over every executable section runs before any
/// rendering starts, because a branch in one section may target another;
/// the finished label map then flows into the rendering sweep as plain
/// data. Both sweeps visit sections in section-table order and
/// instructions in increasing address order.
pub struct DisasmView<'a> {
    decoder: &'a dyn Decoder,
    formatter: &'a dyn LineFormatter,
    theme: &'a Theme,
}

impl<'a> DisasmView<'a> {
    pub fn new(
        decoder: &'a dyn Decoder,
        formatter: &'a dyn LineFormatter,
        theme: &'a Theme,
    ) -> Self {
        Self {
            decoder,
            formatter,
            theme,
        }
    }

    /// Render every executable section of `meta` to `out`.
    ///
    /// If the binary's architecture field does not match the decoder's,
    /// both passes are skipped and nothing is written; the omission is the
    /// only diagnostic.
    pub fn render(
        &self,
        image: &[u8],
        meta: &BinaryMetadata,
        out: &mut dyn Write,
    ) -> Result<(), DisassemblyError> {
        if self.decoder.architecture() != meta.architecture {
            log::debug!(
                "architecture mismatch: binary is {}, decoder is {}; skipping disassembly",
                meta.architecture,
                self.decoder.architecture()
            );
            return Ok(());
        }

        let labels = labels::scan(image, meta, self.decoder)?;
        let resolver = NameResolver::new(&meta.symbols, &labels);

        let display_base = GLOBAL_POINTER_SYMBOLS
            .iter()
            .find_map(|name| meta.symbol_value(name))
            .unwrap_or(0);

        for (index, section) in meta.sections.iter().enumerate() {
            if !section.executable {
                continue;
            }
            self.render_section(image, index, section, &resolver, display_base, out)?;
        }

        Ok(())
    }

    fn render_section(
        &self,
        image: &[u8],
        index: usize,
        section: &Section,
        resolver: &NameResolver,
        display_base: Address,
        out: &mut dyn Write,
    ) -> Result<(), DisassemblyError> {
        writeln!(
            out,
            "{}",
            self.formatter.section_header(index, section, self.theme)
        )?;

        let start = section.offset;
        let end = (section.offset + section.size as Address).min(image.len() as Address);
        let pc_offset = section.pc_offset();

        let mut history: VecDeque<crate::Insn> = VecDeque::with_capacity(HISTORY_DEPTH);
        walker::walk_section(image, start, end, self.decoder, |insn, at, next| {
            if history.len() == HISTORY_DEPTH {
                history.pop_front();
            }
            history.push_back(insn.clone());

            let line = self.formatter.line(
                insn,
                &history,
                at,
                next,
                pc_offset,
                display_base,
                resolver,
                self.theme,
            )?;
            writeln!(out, "{line}")?;
            Ok(())
        })
    }
}
