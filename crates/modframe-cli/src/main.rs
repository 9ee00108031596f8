use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modframe_core::FrameLayout;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("MODFRAME_BUILD_COMMIT"),
    " ",
    env!("MODFRAME_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "modframe")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decoder for fixed-layout binary telemetry frames (Modbus-style responses).",
    long_about = None,
    after_help = "Examples:\n  modframe decode frame.bin --layout layout.json -o result.json\n  modframe decode \"01 03 00 02 00 c8 9c e5\" --hex --layout layout.json --stdout\n  modframe check --layout layout.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one raw frame against a layout and emit the JSON result.
    #[command(
        after_help = "Examples:\n  modframe decode frame.bin --layout layout.json -o result.json\n  modframe decode frame.bin --layout layout.json --stdout --pretty"
    )]
    Decode {
        /// Path to a raw binary frame file, or a hex string with --hex
        frame: String,

        /// Path to the layout configuration (JSON)
        #[arg(short = 'l', long)]
        layout: PathBuf,

        /// Output result path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write the JSON result to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Treat FRAME as hex text instead of a file path
        #[arg(long)]
        hex: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },

    /// Validate a layout configuration without decoding anything.
    Check {
        /// Path to the layout configuration (JSON)
        #[arg(short = 'l', long)]
        layout: PathBuf,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            frame,
            layout,
            report,
            stdout,
            hex,
            pretty,
            compact,
            quiet,
        } => cmd_decode(frame, layout, report, stdout, hex, pretty, compact, quiet),
        Commands::Check { layout, quiet } => cmd_check(layout, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<&'static str>,
}

impl CliError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(message: impl Into<String>, hint: &'static str) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string())
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_decode(
    frame: String,
    layout_path: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    hex: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let layout = load_layout(&layout_path, quiet)?;
    let bytes = load_frame(&frame, hex)?;

    let decoded = modframe_core::decode(&layout, &bytes).map_err(|err| {
        CliError::with_hint(
            format!("decode failed: {err}"),
            "the frame does not match the configured layout",
        )
    })?;

    let json = serialize_result(&decoded, pretty, compact)?;

    if stdout {
        print!("{}", json);
        return Ok(());
    }

    let report = report.expect("report required when not using stdout");
    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&report, json)
        .with_context(|| format!("Failed to write result: {}", report.display()))?;

    if !quiet {
        eprintln!("OK: decoded frame -> {}", report.display());
    }
    Ok(())
}

fn cmd_check(layout_path: PathBuf, quiet: bool) -> Result<(), CliError> {
    let layout = load_layout(&layout_path, quiet)?;
    if !quiet {
        eprintln!("OK: layout valid ({} fields)", layout.fields().len());
    }
    Ok(())
}

fn load_layout(path: &PathBuf, quiet: bool) -> Result<FrameLayout, CliError> {
    if !path.exists() {
        return Err(CliError::with_hint(
            format!("layout file not found: {}", path.display()),
            "pass the layout JSON with -l/--layout",
        ));
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout file: {}", path.display()))?;
    let layout = FrameLayout::from_json(&text).map_err(|err| {
        CliError::with_hint(
            format!("invalid layout: {err}"),
            "fix the layout configuration and rerun",
        )
    })?;
    if !quiet {
        for warning in layout.warnings() {
            eprintln!("warning: {}", warning);
        }
    }
    Ok(layout)
}

fn load_frame(frame: &str, hex: bool) -> Result<Vec<u8>, CliError> {
    if hex {
        return parse_hex(frame);
    }
    let path = PathBuf::from(frame);
    if !path.exists() {
        return Err(CliError::with_hint(
            format!("frame file not found: {}", path.display()),
            "pass a raw binary file, or use --hex for hex text",
        ));
    }
    fs::read(&path)
        .with_context(|| format!("Failed to read frame file: {}", path.display()))
        .map_err(Into::into)
}

fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let digits: Vec<u8> = text
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| {
            ch.to_digit(16).map(|d| d as u8).ok_or_else(|| {
                CliError::with_hint(
                    format!("invalid hex digit `{ch}`"),
                    "frame hex may contain [0-9a-fA-F] and whitespace only",
                )
            })
        })
        .collect::<Result<_, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(CliError::with_hint(
            "odd number of hex digits",
            "each frame byte needs two hex digits",
        ));
    }
    Ok(digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

fn serialize_result(
    decoded: &modframe_core::DecodedFrame,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::with_hint(
            "cannot use --pretty and --compact together",
            "choose one output format",
        ));
    }
    if pretty {
        serde_json::to_string_pretty(decoded)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(decoded)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}
