//! Command-line interface for pcmforge
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Streaming PCM conversion, trimming and waveform summaries
#[derive(Parser, Debug)]
#[command(
    name = "pcmforge",
    version,
    about = "Streaming PCM conversion, trimming and waveform summaries"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert an audio file to WAV (or m4a when an encoder is available)
    Convert {
        /// Input audio file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Target sample rate in Hz (default: source rate)
        #[arg(long, short = 'r', value_name = "HZ")]
        sample_rate: Option<u32>,

        /// Target channel count (default: source channels)
        #[arg(long, short = 'c', value_name = "N")]
        channels: Option<u32>,

        /// Target bit depth: 8, 16, 24 or 32 (default: conversion.bit_depth)
        #[arg(long, short = 'b', value_name = "BITS")]
        bit_depth: Option<u32>,
    },

    /// Copy the [start, end) window of an audio file
    Trim {
        /// Input audio file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Window start in milliseconds
        #[arg(long, value_name = "MS")]
        start_ms: i64,

        /// Window end in milliseconds (exclusive)
        #[arg(long, value_name = "MS")]
        end_ms: i64,

        /// Output container: wav or m4a
        #[arg(long, value_name = "FORMAT", default_value = "wav")]
        format: String,
    },

    /// Show duration, sample rate, channels and bit rate of an audio file
    Info {
        /// Audio file to inspect
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a normalized RMS waveform envelope
    Waveform {
        /// Audio file to summarize
        path: PathBuf,

        /// Number of envelope values
        #[arg(long, short = 'n', value_name = "N", default_value = "100")]
        samples: usize,
    },

    /// Serve method calls on a Unix socket (foreground)
    Serve {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/pcmforge.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Send one method call to a running server
    Call {
        /// Method name (e.g. getAudioInfo, convertToWavBytes)
        method: String,

        /// Arguments as a JSON object
        #[arg(value_name = "JSON", default_value = "{}")]
        args: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/pcmforge.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment overrides)
    Show,
    /// Print the configuration file path
    Path,
}
