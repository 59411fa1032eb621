//! MENSCH Dump
//!
//! Dumps memory from a W65C265 board running the MENSCH monitor ROM and
//! converts the captured hex dump into a binary image.
//!
//! # Usage
//!
//! ```bash
//! # List serial ports, marking likely USB adapters (requires serial feature)
//! mensch-dump ports
//!
//! # Dump bank 00 from 0200 to 02FF into dump.txt, then convert to rom.bin
//! mensch-dump dump --low 00:0200 --high 00:02FF -o rom.bin
//!
//! # Convert an existing capture
//! mensch-dump convert dump.txt rom.bin
//!
//! # Write a default configuration file
//! mensch-dump generate config -o mensch-dump.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use mensch_dump::config::ToolConfig;
use mensch_dump::image::{self, format_size, BinaryImage};

#[cfg(feature = "serial")]
use clap::Args;
#[cfg(feature = "serial")]
use mensch_dump::monitor::{Address, AddressRange, MemoryDumper, MonitorSession};
#[cfg(feature = "serial")]
use mensch_dump::serial::port::{find_device, list_ports};
#[cfg(feature = "serial")]
use mensch_dump::serial::SerialConnection;
#[cfg(feature = "serial")]
use mensch_dump::{signal, DumpError};
#[cfg(feature = "serial")]
use regex::Regex;
#[cfg(feature = "serial")]
use std::fs::File;
#[cfg(feature = "serial")]
use std::io::BufWriter;
#[cfg(feature = "serial")]
use std::time::Duration;

/// MENSCH Dump
///
/// Memory dump tool for the W65C265 MENSCH monitor ROM
#[derive(Parser)]
#[command(name = "mensch-dump")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Dump memory from the W65C265 MENSCH monitor over serial")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports (requires --features serial)
    #[cfg(feature = "serial")]
    Ports {
        /// Device name pattern used to mark likely adapters
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Print the first port matching the device pattern (requires --features serial)
    #[cfg(feature = "serial")]
    Detect {
        /// Device name pattern (regex)
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Dump a memory range from the monitor (requires --features serial)
    #[cfg(feature = "serial")]
    Dump(DumpArgs),

    /// Convert a captured dump into a binary image
    Convert {
        /// Captured monitor output
        capture: PathBuf,

        /// Binary image to write
        output: PathBuf,
    },

    /// Generate configuration files
    #[command(subcommand)]
    Generate(GenerateCommands),
}

#[cfg(feature = "serial")]
#[derive(Args)]
struct DumpArgs {
    /// First address to dump (BB:AAAA)
    #[arg(long)]
    low: Address,

    /// Last address to dump (BB:AAAA)
    #[arg(long)]
    high: Address,

    /// Serial port path (auto-detected when omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read/write timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Show the startup banner as a hex dump
    #[arg(short, long)]
    raw: bool,

    /// File receiving the raw monitor output
    #[arg(short, long)]
    capture: Option<PathBuf>,

    /// Convert the capture into this binary image
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Generate a configuration file with default settings
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = match &cli.config {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };

    match cli.command {
        #[cfg(feature = "serial")]
        Commands::Ports { pattern } => handle_ports(pattern, &config),
        #[cfg(feature = "serial")]
        Commands::Detect { pattern } => handle_detect(pattern, &config),
        #[cfg(feature = "serial")]
        Commands::Dump(args) => handle_dump(args, &config),
        Commands::Convert { capture, output } => handle_convert(&capture, &output),
        Commands::Generate(cmd) => handle_generate(cmd, &config),
    }
}

#[cfg(feature = "serial")]
fn device_pattern(pattern: Option<String>, config: &ToolConfig) -> Result<Regex> {
    let pattern = pattern.unwrap_or_else(|| config.serial.device_pattern.clone());
    Regex::new(&pattern).with_context(|| format!("Invalid device pattern: {}", pattern))
}

#[cfg(feature = "serial")]
fn handle_ports(pattern: Option<String>, config: &ToolConfig) -> Result<()> {
    let pattern = device_pattern(pattern, config)?;
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        return Ok(());
    }

    println!("{}", "Available serial ports:".green().bold());
    for port in &ports {
        let marker = if pattern.is_match(&port.path) {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!("\n {} {}", marker, port.path.white().bold());
        if let Some(ref prod) = port.product {
            println!("    Product: {}", prod);
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            println!("    VID:PID: {:04x}:{:04x}", vid, pid);
        }
    }

    println!("\n{} marks ports matching {}", "*".green().bold(), pattern);
    Ok(())
}

#[cfg(feature = "serial")]
fn handle_detect(pattern: Option<String>, config: &ToolConfig) -> Result<()> {
    let pattern = device_pattern(pattern, config)?;

    println!(
        "{} Looking for a serial device matching {}...",
        "[*]".cyan().bold(),
        pattern
    );

    match find_device(&pattern)? {
        Some(path) => {
            println!("{} Detected: {}", "[OK]".green().bold(), path.white());
            println!("\n{}", "To dump:".cyan());
            println!("  mensch-dump dump -p {} --low 00:0000 --high 00:00FF", path);
        }
        None => {
            println!("{}", "No matching serial device detected".yellow());
            println!("\n{}", "Troubleshooting:".white().bold());
            println!("  1. Connect the USB-to-serial adapter");
            println!("  2. Check permissions: sudo usermod -aG dialout $USER");
            println!("  3. Run `mensch-dump ports` and pass --pattern or -p");
        }
    }

    Ok(())
}

#[cfg(feature = "serial")]
fn handle_dump(args: DumpArgs, config: &ToolConfig) -> Result<()> {
    let range = AddressRange::new(args.low, args.high);
    if !range.is_ordered() {
        anyhow::bail!(
            "Low address {} is above high address {}",
            range.low,
            range.high
        );
    }

    // Try to auto-detect port if not specified
    let port_path = match args.port.or_else(|| config.serial.port.clone()) {
        Some(path) => path,
        None => {
            let pattern = device_pattern(None, config)?;
            match find_device(&pattern)? {
                Some(path) => {
                    println!("{} Auto-detected: {}", "[OK]".green().bold(), path.white());
                    path
                }
                None => {
                    eprintln!("{} No USB serial ports detected", "[ERROR]".red().bold());
                    eprintln!("Use -p to specify port manually");
                    std::process::exit(1);
                }
            }
        }
    };

    let mut port_config = config.port_config(&port_path);
    if let Some(baud) = args.baud {
        port_config = port_config.with_baud_rate(baud);
    }
    if let Some(secs) = args.timeout {
        port_config = port_config.with_timeout(Duration::from_secs(secs));
    }

    println!(
        "{} Opening {} (baud: {})",
        "[*]".cyan().bold(),
        port_path.white(),
        port_config.baud_rate
    );
    let connection = SerialConnection::open(port_config)?;
    let cancel = signal::install_interrupt_handler().context("Failed to install Ctrl+C handler")?;
    let mut session = MonitorSession::new(connection);

    println!(
        "{} Press the reset button on the board to begin (Ctrl+C to abort)",
        "[*]".cyan().bold()
    );
    let banner = match session.wait_for_startup(&cancel) {
        Ok(banner) => banner,
        Err(DumpError::Cancelled) => {
            println!("{} Aborted before the monitor started", "[*]".yellow().bold());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{} Monitor ready", "[OK]".green().bold());
    print_banner(&banner, args.raw || config.serial.show_raw);

    let capture_path = args
        .capture
        .unwrap_or_else(|| config.dump.capture_file.clone());
    let file = File::create(&capture_path)
        .with_context(|| format!("Failed to create capture file: {}", capture_path.display()))?;
    let mut sink = BufWriter::new(file);

    println!(
        "{} Dumping {} into {}",
        "[*]".cyan().bold(),
        range,
        capture_path.display()
    );
    let dumper = MemoryDumper::new(config.dump_settings());
    let total = dumper
        .dump(&mut session, &range, &mut sink)
        .map_err(|e| {
            let needs_reset = e.needs_reset();
            let err = anyhow::Error::from(e);
            if needs_reset {
                err.context("Monitor lost sync; press reset and try again")
            } else {
                err
            }
        })?;
    drop(sink);

    println!(
        "{} Captured {} bytes into {}",
        "[OK]".green().bold(),
        total,
        capture_path.display()
    );

    if let Some(output) = args.output.or_else(|| config.dump.output_file.clone()) {
        handle_convert(&capture_path, &output)?;
    }

    Ok(())
}

#[cfg(feature = "serial")]
fn print_banner(banner: &[u8], raw: bool) {
    if raw {
        println!("{}", "==RAW OUTPUT==".cyan().bold());
        hexdump::hexdump(banner);
    } else {
        println!("{}", "==OUTPUT==".cyan().bold());
        for line in String::from_utf8_lossy(banner).split('\r') {
            let line = line.trim();
            if !line.is_empty() {
                println!("{}", line);
            }
        }
    }
    println!("{}", "===".cyan().bold());
}

fn handle_convert(capture: &Path, output: &Path) -> Result<()> {
    let image = image::convert_file(capture, output)
        .with_context(|| format!("Failed to convert {}", capture.display()))?;

    if image.is_empty() {
        println!(
            "{} No data lines found in {}",
            "[WARNING]".yellow(),
            capture.display()
        );
    }
    print_image_summary(&image, output);
    Ok(())
}

fn print_image_summary(image: &BinaryImage, output: &Path) {
    println!(
        "{} Image written to {}",
        "[OK]".green().bold(),
        output.display()
    );
    println!(
        "  Size: {} ({} bytes)",
        format_size(image.len() as u64),
        image.len()
    );
    println!("  CRC-32: {:08X}", image.checksum());
}

fn handle_generate(cmd: GenerateCommands, config: &ToolConfig) -> Result<()> {
    match cmd {
        GenerateCommands::Config { output } => {
            let content = config.to_toml()?;

            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!(
                    "{} Configuration written to {}",
                    "[OK]".green().bold(),
                    path.display()
                );
            } else {
                println!("{}", content);
            }
        }
    }

    Ok(())
}
