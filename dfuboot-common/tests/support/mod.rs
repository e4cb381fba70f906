// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory NOR flash used by the integration tests.

#![allow(dead_code)]

use dfuboot_common::layout::{FirmwareRegion, FlashGeometry, MemoryLayout, RAM_BASE};
use dfuboot_common::FlashProgrammer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u32),
    Write(u32, usize),
    Invalidate,
}

/// Flash image starting at `base`. Programming can only clear bits, like
/// real NOR, and any attempt to program a byte that was not erased is
/// counted.
pub struct MockFlash {
    pub base: u32,
    pub row_size: u32,
    pub page_size: u32,
    pub mem: Vec<u8>,
    pub ops: Vec<FlashOp>,
    pub unerased_writes: usize,
}

impl MockFlash {
    /// Flash covering the firmware region plus one spare block, filled with
    /// stale non-erased contents.
    pub fn for_layout(layout: &MemoryLayout) -> Self {
        let len = layout.region.size + layout.geometry.row_size;
        Self {
            base: layout.region.start,
            row_size: layout.geometry.row_size,
            page_size: layout.geometry.page_size,
            mem: vec![0xA5; len as usize],
            ops: Vec::new(),
            unerased_writes: 0,
        }
    }

    pub fn bytes(&self, addr: u32, len: usize) -> &[u8] {
        let start = (addr - self.base) as usize;
        &self.mem[start..start + len]
    }

    pub fn erases(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FlashOp::Erase(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, FlashOp::Write(..)))
            .count()
    }
}

impl FlashProgrammer for MockFlash {
    fn erase_row(&mut self, addr: u32) {
        assert_eq!(addr % self.row_size, 0, "row erase must be row-aligned");
        self.ops.push(FlashOp::Erase(addr));
        let start = (addr - self.base) as usize;
        let end = (start + self.row_size as usize).min(self.mem.len());
        self.mem[start..end].fill(0xFF);
    }

    fn write_page(&mut self, addr: u32, data: &[u8]) {
        assert_eq!(addr % self.page_size, 0, "page write must be page-aligned");
        assert!(data.len() <= self.page_size as usize, "write exceeds one page");
        self.ops.push(FlashOp::Write(addr, data.len()));
        let start = (addr - self.base) as usize;
        for (dst, &src) in self.mem[start..start + data.len()].iter_mut().zip(data) {
            if *dst != 0xFF {
                self.unerased_writes += 1;
            }
            *dst &= src;
        }
    }

    fn invalidate_cache(&mut self) {
        self.ops.push(FlashOp::Invalidate);
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        buf.copy_from_slice(self.bytes(addr, buf.len()));
    }
}

/// Small layout where one transfer block is exactly one row.
pub fn row_sized_layout() -> MemoryLayout {
    MemoryLayout {
        region: FirmwareRegion {
            start: 0x0000_2000,
            size: 0x0000_1000,
        },
        geometry: FlashGeometry {
            row_size: 256,
            page_size: 64,
            block_size: 256,
        },
        ram_floor: RAM_BASE,
    }
}

/// Small layout where a row spans four transfer blocks.
pub fn small_block_layout() -> MemoryLayout {
    MemoryLayout {
        region: FirmwareRegion {
            start: 0x1001_0000,
            size: 0x0000_4000,
        },
        geometry: FlashGeometry {
            row_size: 1024,
            page_size: 256,
            block_size: 256,
        },
        ram_floor: RAM_BASE,
    }
}

/// Deterministic image whose vector table points into `layout`.
pub fn sample_image(layout: &MemoryLayout, len: usize) -> Vec<u8> {
    let mut image: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
    image[0..4].copy_from_slice(&0x2000_1000u32.to_le_bytes());
    image[4..8].copy_from_slice(&(layout.region.start + 0x101).to_le_bytes());
    image
}
