use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use symdis::decoder::CapstoneDecoder;
use symdis::format::OutputFormat;
use symdis::parser::GoblinParser;
use symdis::render::DisasmView;
use symdis::theme::Theme;
use symdis::{view, BinaryParser};

#[derive(Parser)]
#[command(name = "symdis", version, about = "A symbol-aware binary disassembly viewer")]
struct Args {
    /// Binary file to inspect
    path: PathBuf,

    /// Enable color output
    #[arg(short, long)]
    color: bool,

    /// Output format for the disassembly view
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(flatten)]
    views: Views,
}

/// Which views to print; at least one must be requested.
#[derive(clap::Args)]
#[group(required = true, multiple = true)]
struct Views {
    /// Print the file header summary
    #[arg(short = 'e', long)]
    header: bool,

    /// Print the section headers
    #[arg(short, long)]
    sections: bool,

    /// Print the symbol table
    #[arg(short = 't', long)]
    symbols: bool,

    /// Print the disassembly
    #[arg(short, long)]
    disassembly: bool,

    /// Print everything
    #[arg(short, long)]
    all: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data = fs::read(&args.path)
        .with_context(|| format!("cannot read '{}'", args.path.display()))?;
    let meta = GoblinParser::new()
        .parse(&data)
        .with_context(|| format!("cannot parse '{}'", args.path.display()))?;

    let theme = Theme::new(args.color);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.views.all || args.views.header {
        view::print_heading(&mut out, "File Header", &theme)?;
        view::print_header(&mut out, &meta, &theme)?;
    }
    if args.views.all || args.views.sections {
        view::print_heading(&mut out, "Section Headers", &theme)?;
        view::print_sections(&mut out, &meta, &theme)?;
    }
    if args.views.all || args.views.symbols {
        view::print_heading(&mut out, "Symbol Table", &theme)?;
        view::print_symbols(&mut out, &meta, &theme)?;
    }
    if args.views.all || args.views.disassembly {
        // No decoder for this architecture means the disassembly view is
        // silently omitted; every other requested view has already run.
        match CapstoneDecoder::for_architecture(meta.architecture) {
            Ok(decoder) => {
                view::print_heading(&mut out, "Disassembly", &theme)?;
                let formatter = args.format.formatter();
                let disasm = DisasmView::new(&decoder, formatter.as_ref(), &theme);
                disasm.render(&data, &meta, &mut out)?;
            }
            Err(err) => {
                log::debug!("no decoder for {}: {err}; skipping disassembly", meta.architecture);
            }
        }
    }

    writeln!(out)?;
    Ok(())
}
