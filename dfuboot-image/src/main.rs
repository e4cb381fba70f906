// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host-side companion for the dfuboot boot ROM.
//!
//! Usage:
//!   dfuboot-image check firmware.bin
//!   dfuboot-image simulate firmware.bin

mod cli;
mod commands;
mod sim;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
