//! Command line and keyboard input

use pumpwatch_core::config::DEFAULT_CONFIG_FILE;
use pumpwatch_core::signal::Pin;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("unknown argument: {0}")]
    Unknown(String),
}

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the instrument
    Run(RunOptions),
    /// Write a config template with default values
    WriteConfig(PathBuf),
    /// Print the effective configuration as JSON
    ShowConfig(PathBuf),
    Version,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub config: PathBuf,
    /// Run without the analog subsystem, as if no ADC were present
    pub no_analog: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            no_analog: false,
        }
    }
}

/// Parse arguments, program name excluded
pub fn parse_args<I, S>(args: I) -> Result<Command, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let mut options = RunOptions::default();
    let mut show_config = false;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--config" | "-c" => {
                let value = args.get(i + 1).ok_or(ArgsError::MissingValue("--config"))?;
                options.config = PathBuf::from(value);
                i += 2;
                continue;
            }
            "--write-config" => {
                let value = args.get(i + 1).ok_or(ArgsError::MissingValue("--write-config"))?;
                return Ok(Command::WriteConfig(PathBuf::from(value)));
            }
            "--show-config" => show_config = true,
            "--no-analog" => options.no_analog = true,
            other => return Err(ArgsError::Unknown(other.to_string())),
        }
        i += 1;
    }

    if show_config {
        return Ok(Command::ShowConfig(options.config));
    }
    Ok(Command::Run(options))
}

pub fn print_help() {
    println!("Usage: pumpwatch [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config PATH        Configuration file (default: {})", DEFAULT_CONFIG_FILE);
    println!("      --no-analog          Run without pressure transducers");
    println!("      --write-config PATH  Write a configuration template and exit");
    println!("      --show-config        Print the effective configuration and exit");
    println!("  -v, --version            Show version");
    println!("  -h, --help               Show this help");
    println!();
    println!("Keys (followed by Enter):");
    println!("  s  start          x  first split");
    println!("  1  stop sensor A  2  stop sensor B");
    println!("  m  manual measure r  reset");
    println!("  q  quit");
}

/// Keyboard command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Simulated edge on a pin
    Press(Pin),
    Quit,
}

/// Map a typed line to a key; unknown input maps to nothing
pub fn parse_key(line: &str) -> Option<Key> {
    match line.trim() {
        "s" => Some(Key::Press(Pin::Start)),
        "x" => Some(Key::Press(Pin::FirstSplit)),
        "1" => Some(Key::Press(Pin::StopA)),
        "2" => Some(Key::Press(Pin::StopB)),
        "m" => Some(Key::Press(Pin::ManualMeasure)),
        "r" => Some(Key::Press(Pin::Reset)),
        "q" => Some(Key::Quit),
        _ => None,
    }
}
