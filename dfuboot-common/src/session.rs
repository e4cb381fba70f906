// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! DFU request state machine for a download-only device.
//!
//! Maps class requests onto the download handler callbacks. Flash work is
//! done synchronously while the DNLOAD request is handled, so the device is
//! never reported busy and the poll timeout is always zero.

use crate::download::{DownloadHandler, DownloadState, FlashProgrammer};
use crate::protocol::{DfuState, DfuStatus, StatusRecord};

pub struct DfuSession<'a, F: FlashProgrammer> {
    handler: DownloadHandler<'a, F>,
    state: DfuState,
    status: DfuStatus,
}

impl<'a, F: FlashProgrammer> DfuSession<'a, F> {
    pub fn new(mut handler: DownloadHandler<'a, F>) -> Self {
        handler.reset();
        Self {
            handler,
            state: DfuState::DfuIdle,
            status: DfuStatus::Ok,
        }
    }

    /// Start in `dfuERROR`/`errFIRMWARE` so the host knows there is no
    /// runnable image to return to.
    pub fn mark_firmware_corrupt(&mut self) {
        self.fail(DfuStatus::ErrFirmware);
    }

    pub fn state(&self) -> DfuState {
        self.state
    }

    pub fn status(&self) -> DfuStatus {
        self.status
    }

    pub fn handler(&self) -> &DownloadHandler<'a, F> {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut DownloadHandler<'a, F> {
        &mut self.handler
    }

    /// `DFU_DNLOAD`. An `Err` means the request must be stalled.
    pub fn dnload(&mut self, block_num: u16, data: &[u8]) -> Result<(), DfuStatus> {
        if data.is_empty() {
            if self.state != DfuState::DnloadIdle {
                return Err(self.fail(DfuStatus::ErrStalledPkt));
            }
            self.state = DfuState::ManifestSync;
            return Ok(());
        }

        if !matches!(self.state, DfuState::DfuIdle | DfuState::DnloadIdle) {
            return Err(self.fail(DfuStatus::ErrStalledPkt));
        }

        let length = u16::try_from(data.len()).unwrap_or(u16::MAX);
        if let Err(status) = self.handler.on_block_begin(block_num, length) {
            return Err(self.fail(status));
        }

        let page_size = self.handler.layout().geometry.page_size as usize;
        for (i, chunk) in data.chunks(page_size).enumerate() {
            // i * page_size < data.len() <= u16::MAX
            self.handler.on_packet(block_num, (i * page_size) as u16, chunk);
        }

        let status = self.handler.on_block_done(block_num, length);
        if !status.is_ok() {
            return Err(self.fail(status));
        }

        self.state = DfuState::DnloadSync;
        Ok(())
    }

    /// `DFU_GETSTATUS`. Advances sync states, triggering manifestation.
    pub fn get_status(&mut self) -> StatusRecord {
        let reported = match self.state {
            DfuState::DnloadSync => {
                self.state = DfuState::DnloadIdle;
                DfuState::DnloadIdle
            }
            DfuState::ManifestSync => {
                self.handler.on_manifest();
                self.state = DfuState::ManifestWaitReset;
                DfuState::Manifest
            }
            state => state,
        };

        StatusRecord {
            status: self.status,
            poll_timeout_ms: 0,
            state: reported,
        }
    }

    /// `DFU_GETSTATE`.
    pub fn get_state(&self) -> DfuState {
        self.state
    }

    /// `DFU_CLRSTATUS`. Only valid in `dfuERROR`.
    pub fn clear_status(&mut self) -> Result<(), DfuStatus> {
        if self.state != DfuState::Error {
            return Err(self.fail(DfuStatus::ErrStalledPkt));
        }
        self.status = DfuStatus::Ok;
        self.state = DfuState::DfuIdle;
        self.handler.reset();
        Ok(())
    }

    /// `DFU_ABORT`.
    pub fn abort(&mut self) -> Result<(), DfuStatus> {
        match self.state {
            DfuState::DfuIdle
            | DfuState::DnloadSync
            | DfuState::DnloadIdle
            | DfuState::ManifestSync => {
                self.status = DfuStatus::Ok;
                self.state = DfuState::DfuIdle;
                self.handler.reset();
                Ok(())
            }
            _ => Err(DfuStatus::ErrStalledPkt),
        }
    }

    /// Bus reset. Interrupting a transfer is reported as `errUSBR`.
    pub fn usb_reset(&mut self) {
        match self.state {
            DfuState::DnloadSync
            | DfuState::DnBusy
            | DfuState::DnloadIdle
            | DfuState::ManifestSync
            | DfuState::Manifest => {
                self.fail(DfuStatus::ErrUsbReset);
            }
            _ => {}
        }
    }

    /// True once the handler has seen the end of the transfer.
    pub fn is_manifested(&self) -> bool {
        self.handler.state() == DownloadState::Manifested
    }

    fn fail(&mut self, status: DfuStatus) -> DfuStatus {
        self.status = status;
        self.state = DfuState::Error;
        status
    }
}
