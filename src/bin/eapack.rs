//! Command line front end for the eapack codecs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use eapack::{compress_with, decompress_with, detect_compression_type};
use eapack::{CompressionType, RefPackOptions, StreamConfiguration, StreamHeader};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eapack")]
#[command(about = "RefPack / LZHL / zlib archive stream tool", long_about = None)]
struct Cli {
    /// Log codec activity (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file and prepend the stream header
    Compress {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Format: refpack, lzhl, zlib or zlib1..zlib9
        #[arg(short, long, default_value = "refpack")]
        format: CompressionType,

        /// RefPack hash-chain depth
        #[arg(long, default_value_t = 4096)]
        chain_depth: usize,
    },

    /// Decompress a headed stream
    Decompress {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Refuse streams declaring more than this many bytes
        #[arg(long, default_value_t = 256 * 1024 * 1024)]
        max_size: usize,
    },

    /// Report the format of a file
    Detect {
        /// File to inspect
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            chain_depth,
        } => {
            if format == CompressionType::None {
                bail!("choose a compression format");
            }
            let data = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let config = StreamConfiguration {
                refpack: RefPackOptions {
                    max_chain_depth: chain_depth,
                },
                ..StreamConfiguration::default()
            };

            let start = Instant::now();
            let packed = compress_with(&data, format, &config)?;
            let elapsed = start.elapsed();
            fs::write(&output, &packed)
                .with_context(|| format!("failed to write {}", output.display()))?;

            info!(%format, elapsed_ms = elapsed.as_millis() as u64, "compressed");
            println!(
                "{} -> {} ({} -> {} bytes, {:.1}%)",
                input.display(),
                output.display(),
                data.len(),
                packed.len(),
                ratio(packed.len(), data.len())
            );
        }

        Commands::Decompress {
            input,
            output,
            max_size,
        } => {
            let data = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let config = StreamConfiguration {
                max_uncompressed_size: max_size,
                ..StreamConfiguration::default()
            };

            let start = Instant::now();
            let unpacked = decompress_with(&data, &config)
                .with_context(|| format!("failed to decompress {}", input.display()))?;
            let elapsed = start.elapsed();
            fs::write(&output, &unpacked)
                .with_context(|| format!("failed to write {}", output.display()))?;

            info!(elapsed_ms = elapsed.as_millis() as u64, "decompressed");
            println!(
                "{} -> {} ({} -> {} bytes)",
                input.display(),
                output.display(),
                data.len(),
                unpacked.len()
            );
        }

        Commands::Detect { file } => {
            let data =
                fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            match detect_compression_type(&data) {
                CompressionType::None => println!("{}: uncompressed", file.display()),
                ty => {
                    let header = StreamHeader::parse(&data)?;
                    println!(
                        "{}: {} ({} bytes uncompressed, {} bytes stored)",
                        file.display(),
                        ty,
                        header.uncompressed_size,
                        data.len()
                    );
                }
            }
        }
    }

    Ok(())
}

fn ratio(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        100.0
    } else {
        compressed as f64 * 100.0 / original as f64
    }
}
