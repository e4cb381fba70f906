// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "dfuboot-image")]
#[command(about = "Image checker and DFU transfer simulator for dfuboot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check that an image would be accepted and booted
    Check {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a full DFU download of an image against simulated flash
    Simulate {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { file } => commands::check(&file),
        Commands::Simulate { file } => commands::simulate(&file),
    }
}
