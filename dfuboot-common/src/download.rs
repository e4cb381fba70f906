// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! DFU download handler: block admission, erase-before-write, packet
//! programming and manifestation.
//!
//! The USB stack drives one block at a time:
//!
//! ```text
//! Idle -> BlockAnnounced -> Streaming -> BlockComplete -> (next block) ...
//!                                                      \-> Manifested
//! ```
//!
//! A row is erased when a block lands outside the span the handler knows to
//! be blank. Blocks already written earlier in that row are read back first
//! and re-programmed after the erase, so a host may start mid-row or retry a
//! block without programming unerased flash. Anything after the block in
//! the same row is dropped and has to be sent again.
//!
//! There is no transaction across blocks. A transfer aborted halfway leaves
//! a partially written region; the validity check on the next boot is the
//! only safety net.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::layout::{FlashGeometry, MemoryLayout, MAX_ROW_SIZE};
use crate::protocol::DfuStatus;

/// Flash primitive the handler programs through. Addresses are absolute
/// byte addresses in the flash address space.
pub trait FlashProgrammer {
    /// Erase the row starting at `addr`.
    fn erase_row(&mut self, addr: u32);

    /// Program `data` at `addr`. `addr` is page-aligned and `data` is at
    /// most one page; a short final page is padded by the implementation.
    fn write_page(&mut self, addr: u32, data: &[u8]);

    /// Drop any cached view of flash contents.
    fn invalidate_cache(&mut self);

    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn read(&mut self, addr: u32, buf: &mut [u8]);
}

impl<F: FlashProgrammer + ?Sized> FlashProgrammer for &mut F {
    fn erase_row(&mut self, addr: u32) {
        (**self).erase_row(addr)
    }

    fn write_page(&mut self, addr: u32, data: &[u8]) {
        (**self).write_page(addr, data)
    }

    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        (**self).read(addr, buf)
    }
}

/// Completion signal raised from the USB context and polled by the
/// update-mode loop. Write-once per session: it is never lowered.
#[derive(Debug, Default)]
pub struct ExitFlag(AtomicBool);

impl ExitFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-block progress of the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DownloadState {
    Idle,
    BlockAnnounced { block: u16 },
    Streaming { block: u16, received: u32 },
    BlockComplete { block: u16 },
    Manifested,
}

pub struct DownloadHandler<'a, F: FlashProgrammer> {
    flash: F,
    layout: MemoryLayout,
    exit: &'a ExitFlag,
    state: DownloadState,
    // [start, end) known to be erased and not yet programmed
    blank: Option<(u32, u32)>,
    row_buf: [u8; MAX_ROW_SIZE as usize],
}

impl<'a, F: FlashProgrammer> DownloadHandler<'a, F> {
    pub fn new(flash: F, layout: MemoryLayout, exit: &'a ExitFlag) -> Self {
        Self {
            flash,
            layout,
            exit,
            state: DownloadState::Idle,
            blank: None,
            row_buf: [0xFF; MAX_ROW_SIZE as usize],
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Return to `Idle`. A manifested handler stays terminal.
    pub fn reset(&mut self) {
        if self.state != DownloadState::Manifested {
            self.state = DownloadState::Idle;
        }
    }

    /// Admit a block and make sure the flash under it is erased.
    ///
    /// Nothing is written to flash when admission fails.
    pub fn on_block_begin(&mut self, block_num: u16, declared_length: u16) -> Result<(), DfuStatus> {
        if self.state == DownloadState::Manifested {
            return Err(DfuStatus::ErrUnknown);
        }

        let geometry = self.layout.geometry;
        if declared_length as u32 > geometry.block_size {
            return Err(DfuStatus::ErrUnknown);
        }

        let offset = block_num as u64 * geometry.block_size as u64;
        if offset > self.layout.region.size as u64 {
            return Err(DfuStatus::ErrAddress);
        }

        let base = self.layout.block_base(block_num);
        let end = base + geometry.block_size;
        let covered = self
            .blank
            .filter(|&(start, stop)| start <= base && end <= stop);
        let blank_end = match covered {
            Some((_, stop)) => stop,
            None => self.erase_rows_under(base, end)?,
        };
        self.blank = Some((end, blank_end));

        self.state = DownloadState::BlockAnnounced { block: block_num };
        Ok(())
    }

    /// Erase every row overlapping `[base, end)`, keeping whatever was
    /// programmed in the first row before `base`. Returns the end of the
    /// last erased row.
    fn erase_rows_under(&mut self, base: u32, end: u32) -> Result<u32, DfuStatus> {
        let FlashGeometry { row_size, page_size, .. } = self.layout.geometry;
        let first_row = base / row_size * row_size;
        let rows_end = end.div_ceil(row_size) * row_size;

        let kept = (base - first_row) as usize;
        if kept > self.row_buf.len() {
            return Err(DfuStatus::ErrErase);
        }
        self.flash.read(first_row, &mut self.row_buf[..kept]);

        for row in (first_row..rows_end).step_by(row_size as usize) {
            self.flash.erase_row(row);
        }

        for (i, page) in self.row_buf[..kept].chunks(page_size as usize).enumerate() {
            if page.iter().any(|&b| b != 0xFF) {
                self.flash.write_page(first_row + i as u32 * page_size, page);
            }
        }

        Ok(rows_end)
    }

    /// Program `data` at `offset` within an admitted block.
    ///
    /// Packets for a block that was not admitted are dropped.
    pub fn on_packet(&mut self, block_num: u16, offset: u16, data: &[u8]) {
        let received = match self.state {
            DownloadState::BlockAnnounced { block } if block == block_num => 0,
            DownloadState::Streaming { block, received } if block == block_num => received,
            _ => return,
        };

        let addr = self.layout.block_base(block_num) + offset as u32;
        self.flash.write_page(addr, data);

        self.state = DownloadState::Streaming {
            block: block_num,
            received: received + data.len() as u32,
        };
    }

    /// Acknowledge the end of a block. Written data is not read back.
    pub fn on_block_done(&mut self, block_num: u16, _length: u16) -> DfuStatus {
        if matches!(
            self.state,
            DownloadState::BlockAnnounced { block } | DownloadState::Streaming { block, .. }
                if block == block_num
        ) {
            self.state = DownloadState::BlockComplete { block: block_num };
        }
        DfuStatus::Ok
    }

    /// End of transfer. Raises the exit flag; no flash access.
    pub fn on_manifest(&mut self) {
        self.state = DownloadState::Manifested;
        self.exit.raise();
    }
}
