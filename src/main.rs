use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zso::{run_decode, run_encode, DecodeProgress, EncodeOptions, EncodeProgress};

/// ISO and ZSO converter.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compression level. 0 means decode; 1-12 encode (1 = fast, >1 = high compression).
    #[arg(short = 'c', long, default_value_t = 9)]
    level: u32,

    /// Compression threshold percent (1-100): blocks at or above this ratio are stored plain.
    #[arg(short, long, default_value_t = 95)]
    threshold: u8,

    /// Alignment shift override. 0 = small/slow, larger = fewer retries on files > 2 GiB.
    #[arg(short, long)]
    align: Option<u8>,

    /// Padding byte used to fill inter-block alignment gaps.
    #[arg(short, long, default_value = "X")]
    pad: char,

    /// Logical block size in bytes; must be a positive multiple of 2048.
    #[arg(short, long, default_value_t = 2048)]
    block_size: u32,

    /// Compress blocks in parallel batches instead of one at a time.
    #[arg(short = 'j', long)]
    parallel: bool,

    /// Input file.
    infile: PathBuf,

    /// Output file.
    outfile: PathBuf,
}

struct EprintEncodeProgress;

impl EncodeProgress for EprintEncodeProgress {
    fn on_block(&self, blocks_done: u64, total_block: u64, write_pos: u64) {
        if total_block == 0 {
            return;
        }
        let percent = 100 * blocks_done / total_block;
        eprint!("compress {percent:3}%   write_pos {write_pos}\r");
    }
}

struct EprintDecodeProgress;

impl DecodeProgress for EprintDecodeProgress {
    fn on_block(&self, blocks_done: u64, total_block: u64) {
        if total_block == 0 {
            return;
        }
        let percent = 100 * blocks_done / total_block;
        eprint!("decompress {percent:3}%\r");
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = if cli.level == 0 {
        println!("Decompress {:?} to {:?}", cli.infile, cli.outfile);
        run_decode(&cli.infile, &cli.outfile, Some(&EprintDecodeProgress))
    } else {
        println!("Compress {:?} to {:?}", cli.infile, cli.outfile);
        let options = EncodeOptions {
            level: cli.level,
            block_size: cli.block_size,
            parallel: cli.parallel,
            threshold_percent: cli.threshold,
            align_override: cli.align,
            padding_byte: cli.pad as u8,
        };
        run_encode(&cli.infile, &cli.outfile, &options, Some(&EprintEncodeProgress))
    };

    eprintln!();
    match result {
        Ok(()) => {
            println!(
                "ziso {} completed",
                if cli.level == 0 { "decompress" } else { "compress" }
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "zso operation failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
