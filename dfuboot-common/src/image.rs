// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware validity check.
//!
//! The image is opaque apart from its first two words, which a Cortex-M
//! vector table defines as the initial stack pointer and the reset vector.
//! An image is trusted as executable only when both look plausible for the
//! target's memory layout. This is a plausibility test, not an integrity
//! check: a partially written image whose first row survived passes it.

use crate::layout::MemoryLayout;

/// The two leading words of an application image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    /// Read the vector table at `addr` via volatile reads.
    ///
    /// # Safety
    /// `addr` must point to at least 8 readable, word-aligned bytes.
    pub unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Decode the vector table from the head of an image file.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let sp = bytes.get(0..4)?;
        let rv = bytes.get(4..8)?;
        Some(Self {
            initial_sp: u32::from_le_bytes([sp[0], sp[1], sp[2], sp[3]]),
            reset_vector: u32::from_le_bytes([rv[0], rv[1], rv[2], rv[3]]),
        })
    }

    pub fn stack_pointer_plausible(&self, layout: &MemoryLayout) -> bool {
        self.initial_sp > layout.ram_floor
    }

    pub fn reset_vector_plausible(&self, layout: &MemoryLayout) -> bool {
        layout.region.contains(self.reset_vector)
    }

    /// True iff the image looks executable.
    pub fn is_valid(&self, layout: &MemoryLayout) -> bool {
        self.stack_pointer_plausible(layout) && self.reset_vector_plausible(layout)
    }
}

