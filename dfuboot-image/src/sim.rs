// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! DFU download against an in-memory flash.
//!
//! Runs the same session and handler code the boot ROM runs, with the host
//! playing the part of a DFU 1.1 download client.

use anyhow::{anyhow, bail, Context, Result};

use dfuboot_common::{
    DfuSession, DfuState, DownloadHandler, ExitFlag, FlashProgrammer, MemoryLayout, VectorTable,
};

/// NOR-style flash: erase sets 0xFF, programming can only clear bits.
pub struct RamFlash {
    base: u32,
    row_size: u32,
    mem: Vec<u8>,
    erases: usize,
    writes: usize,
}

impl RamFlash {
    /// Covers the firmware region plus the row behind its ceiling, which a
    /// boundary block may erase.
    pub fn for_layout(layout: &MemoryLayout) -> Self {
        let geometry = layout.geometry;
        let tail = geometry.row_size.max(geometry.block_size);
        Self {
            base: layout.region.start,
            row_size: geometry.row_size,
            mem: vec![0xFF; (layout.region.size + tail) as usize],
            erases: 0,
            writes: 0,
        }
    }

    pub fn contents(&self, addr: u32, len: usize) -> &[u8] {
        let offset = (addr - self.base) as usize;
        &self.mem[offset..offset + len]
    }
}

impl FlashProgrammer for RamFlash {
    fn erase_row(&mut self, addr: u32) {
        let offset = (addr - self.base) as usize;
        self.mem[offset..offset + self.row_size as usize].fill(0xFF);
        self.erases += 1;
    }

    fn write_page(&mut self, addr: u32, data: &[u8]) {
        let offset = (addr - self.base) as usize;
        for (dst, src) in self.mem[offset..offset + data.len()].iter_mut().zip(data) {
            *dst &= *src;
        }
        self.writes += 1;
    }

    fn invalidate_cache(&mut self) {}

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        let offset = (addr - self.base) as usize;
        buf.copy_from_slice(&self.mem[offset..offset + buf.len()]);
    }
}

#[derive(Debug)]
pub struct SimReport {
    pub blocks: u16,
    pub erases: usize,
    pub writes: usize,
    pub exit_raised: bool,
    pub contents_match: bool,
    pub written_image_valid: bool,
}

/// Download `image` block by block, then manifest.
///
/// `on_block` is called with the length of each block once the device has
/// reported it back in `dfuDNLOAD-IDLE`.
pub fn simulate(
    layout: &MemoryLayout,
    image: &[u8],
    mut on_block: impl FnMut(usize),
) -> Result<SimReport> {
    if image.is_empty() {
        bail!("Image is empty");
    }

    let exit = ExitFlag::new();
    let mut flash = RamFlash::for_layout(layout);
    let mut session = DfuSession::new(DownloadHandler::new(&mut flash, *layout, &exit));

    let mut blocks = 0u16;
    for (i, chunk) in image.chunks(layout.geometry.block_size as usize).enumerate() {
        let block = u16::try_from(i).context("Image needs more blocks than DFU can number")?;

        session
            .dnload(block, chunk)
            .map_err(|status| anyhow!("DNLOAD of block {} stalled: {}", block, status))?;

        let record = session.get_status();
        if record.state != DfuState::DnloadIdle {
            bail!(
                "Block {}: device reported {:?} with status {}",
                block,
                record.state,
                record.status
            );
        }

        on_block(chunk.len());
        blocks = block + 1;
    }

    session
        .dnload(blocks, &[])
        .map_err(|status| anyhow!("Zero-length DNLOAD stalled: {}", status))?;

    let record = session.get_status();
    if record.state != DfuState::Manifest {
        bail!(
            "Manifestation: device reported {:?} with status {}",
            record.state,
            record.status
        );
    }
    drop(session);

    let written = flash.contents(layout.region.start, image.len());
    Ok(SimReport {
        blocks,
        erases: flash.erases,
        writes: flash.writes,
        exit_raised: exit.is_raised(),
        contents_match: written == image,
        written_image_valid: VectorTable::from_bytes(written)
            .is_some_and(|vt| vt.is_valid(layout)),
    })
}
