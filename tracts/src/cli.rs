//! # CLI
//!
//! This module defines the command-line interface of `tracts` using `clap`.
//!
//! It is responsible for parsing user input; the schema document itself is loaded and validated
//! by `main`.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tracts", version, about = "Inspect and convert records described by a schema document")]
pub struct Cli {
    /// Path to the JSON schema document declaring the messages and enums
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Log filter directive (e.g. "debug" or "tracts_core=trace")
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every message and enum declared by the schema
    List,

    /// Describe a message or an enum in detail
    Describe {
        /// Fully qualified name (e.g. zoo.Animal)
        symbol: String,
    },

    /// Decode a record in one encoding and print it in another
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// tracts --schema zoo.json convert zoo.Animal --from json --to query '{"name": "dog"}'
    /// echo 'name=dog&size=4' | tracts --schema zoo.json convert zoo.Animal --from query --to json
    /// ```
    Convert {
        /// Fully qualified message name (e.g. zoo.Animal)
        message: String,

        /// Encoding of the input
        #[arg(long, value_enum, default_value_t = Format::Json)]
        from: Format,

        /// Encoding of the output
        #[arg(long, value_enum, default_value_t = Format::Json)]
        to: Format,

        /// Prefix expected on (and added to) query-string keys
        #[arg(long, default_value = "")]
        prefix: String,

        /// Indent JSON output
        #[arg(long)]
        pretty: bool,

        /// The encoded record. Read from standard input when omitted.
        input: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Query,
}
