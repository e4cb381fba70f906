// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Memory layout shared by the boot ROM, applications and host tools.
//!
//! Flash map (2 MiB part):
//!
//! ```text
//! 0x1000_0000  boot2 + boot ROM            64 KiB
//! 0x1001_0000  firmware region             FW_REGION_SIZE
//! 0x101F_F000  guard row                   4 KiB, never part of the image
//! 0x1020_0000  end of flash
//! ```

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;
pub const BOOTLOADER_SIZE: u32 = 64 * 1024;

pub const FW_START: u32 = FLASH_BASE + BOOTLOADER_SIZE;
pub const GUARD_ROW_ADDR: u32 = FLASH_BASE + FLASH_SIZE - FLASH_ROW_SIZE;
pub const FW_REGION_SIZE: u32 = GUARD_ROW_ADDR - FW_START;
pub const FW_CEILING: u32 = FW_START + FW_REGION_SIZE;

/// Lowest RAM address. A plausible initial stack pointer lies above it.
pub const RAM_BASE: u32 = 0x2000_0000;

pub const FLASH_ROW_SIZE: u32 = 4096; // erase granularity
pub const FLASH_PAGE_SIZE: u32 = 256; // program granularity

/// Largest row the download handler can read back and re-program.
pub const MAX_ROW_SIZE: u32 = 4096;

/// Size of the usb-device control buffer (`control-buffer-256`). A DNLOAD
/// with a longer wLength is stalled by the control pipe before the DFU class
/// sees it, so the session state does not change.
pub const CONTROL_BUFFER_SIZE: usize = 256;

/// DFU `wTransferSize`. Bounded by the usb-device control buffer.
pub const DFU_TRANSFER_SIZE: u16 = 256;

// The admission check lets through one block starting exactly at the region
// end; it must land in the guard row.
const _: () = assert!(FLASH_ROW_SIZE >= DFU_TRANSFER_SIZE as u32);
const _: () = assert!(DFU_TRANSFER_SIZE as usize <= CONTROL_BUFFER_SIZE);
const _: () = assert!(FLASH_ROW_SIZE <= MAX_ROW_SIZE);
const _: () = assert!(FW_START % FLASH_ROW_SIZE == 0);
const _: () = assert!(FW_REGION_SIZE % FLASH_ROW_SIZE == 0);
const _: () = assert!(DFU_TRANSFER_SIZE as u32 % FLASH_PAGE_SIZE == 0);

/// Flash granularities the download path works with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashGeometry {
    pub row_size: u32,
    pub page_size: u32,
    pub block_size: u32,
}

/// The range of flash reserved for the application image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareRegion {
    pub start: u32,
    pub size: u32,
}

impl FirmwareRegion {
    pub const fn ceiling(&self) -> u32 {
        self.start + self.size
    }

    pub fn contains(&self, addr: u32) -> bool {
        (self.start..self.ceiling()).contains(&addr)
    }
}

/// Everything the validity checker and download handler need to know
/// about the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryLayout {
    pub region: FirmwareRegion,
    pub geometry: FlashGeometry,
    pub ram_floor: u32,
}

impl MemoryLayout {
    /// Number of transfer blocks needed to carry `len` bytes.
    pub fn blocks_for(&self, len: u32) -> u32 {
        len.div_ceil(self.geometry.block_size)
    }

    /// Absolute address of the first byte of `block_num`.
    pub fn block_base(&self, block_num: u16) -> u32 {
        self.region.start + block_num as u32 * self.geometry.block_size
    }
}

/// Layout of the RP2040 board this boot ROM ships on.
pub const RP2040_LAYOUT: MemoryLayout = MemoryLayout {
    region: FirmwareRegion {
        start: FW_START,
        size: FW_REGION_SIZE,
    },
    geometry: FlashGeometry {
        row_size: FLASH_ROW_SIZE,
        page_size: FLASH_PAGE_SIZE,
        block_size: DFU_TRANSFER_SIZE as u32,
    },
    ram_floor: RAM_BASE,
};
