// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use dfuboot_common::{MemoryLayout, VectorTable, RP2040_LAYOUT};

use crate::sim;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

fn read_image(file: &Path) -> Result<Vec<u8>> {
    fs::read(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Print what the boot ROM would make of an image.
pub fn check(file: &Path) -> Result<()> {
    let image = read_image(file)?;
    let layout = RP2040_LAYOUT;

    let vt = VectorTable::from_bytes(&image)
        .with_context(|| format!("{} is shorter than a vector table", file.display()))?;

    println!("Image:        {} ({} bytes)", file.display(), image.len());
    println!("CRC32:        0x{:08x}", CRC32.checksum(&image));
    println!(
        "DFU blocks:   {} x {} bytes",
        layout.blocks_for(image.len() as u32),
        layout.geometry.block_size
    );
    println!(
        "Stack ptr:    0x{:08x} (plausible: {})",
        vt.initial_sp,
        yes_no(vt.stack_pointer_plausible(&layout))
    );
    println!(
        "Reset vector: 0x{:08x} (plausible: {})",
        vt.reset_vector,
        yes_no(vt.reset_vector_plausible(&layout))
    );

    check_fits(&layout, image.len())?;
    if !vt.is_valid(&layout) {
        bail!("The boot ROM would not jump to this image");
    }

    println!("OK");
    Ok(())
}

fn check_fits(layout: &MemoryLayout, len: usize) -> Result<()> {
    if len as u64 > layout.region.size as u64 {
        bail!(
            "Image is {} bytes; the firmware region at 0x{:08x} holds {}",
            len,
            layout.region.start,
            layout.region.size
        );
    }
    Ok(())
}

/// Download an image through the DFU state machine into simulated flash.
pub fn simulate(file: &Path) -> Result<()> {
    let image = read_image(file)?;
    let layout = RP2040_LAYOUT;
    check_fits(&layout, image.len())?;

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let report = match sim::simulate(&layout, &image, |len| pb.inc(len as u64)) {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    };
    pb.finish_with_message("Download complete");
    println!();

    println!("Blocks:        {}", report.blocks);
    println!("Rows erased:   {}", report.erases);
    println!("Pages written: {}", report.writes);
    println!("Exit flag:     {}", yes_no(report.exit_raised));
    println!("Contents:      {}", if report.contents_match { "match" } else { "MISMATCH" });
    println!("Bootable:      {}", yes_no(report.written_image_valid));

    if !report.exit_raised {
        bail!("Manifestation did not raise the exit flag");
    }
    if !report.contents_match {
        bail!("Flash contents differ from the image");
    }
    if !report.written_image_valid {
        bail!("Transfer succeeded but the written image would not boot");
    }

    println!("OK");
    Ok(())
}
