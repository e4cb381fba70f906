// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB DFU class: descriptors and control requests, routed into a
//! `DfuSession`.
//!
//! A DNLOAD whose wLength exceeds `CONTROL_BUFFER_SIZE` never reaches
//! `control_out`: usb-device stalls the setup stage itself. The host sees a
//! pipe error and the session stays in the state it was in, so a following
//! GETSTATUS reports that state with status OK. The session's own length
//! check (errUNKNOWN) only fires when the buffer is larger than a block.

use dfuboot_common::layout::DFU_TRANSFER_SIZE;
use dfuboot_common::protocol::{
    functional_descriptor, DFU_ABORT, DFU_CLRSTATUS, DFU_DNLOAD, DFU_GETSTATE, DFU_GETSTATUS,
    DFU_PROTOCOL_DFU_MODE, DFU_SUBCLASS_FIRMWARE_UPGRADE, DFU_TYPE_FUNCTIONAL,
    USB_CLASS_APPLICATION_SPECIFIC,
};
use dfuboot_common::{DfuSession, DfuStatus, FlashProgrammer};
use usb_device::class_prelude::*;
use usb_device::control::{Recipient, Request, RequestType};

const INTERFACE_NAME: &str = "dfuboot flash";

pub struct DfuClass<F: FlashProgrammer> {
    iface: InterfaceNumber,
    name: StringIndex,
    session: DfuSession<'static, F>,
}

impl<F: FlashProgrammer> DfuClass<F> {
    pub fn new<B: UsbBus>(alloc: &UsbBusAllocator<B>, session: DfuSession<'static, F>) -> Self {
        Self {
            iface: alloc.interface(),
            name: alloc.string(),
            session,
        }
    }

    pub fn session_mut(&mut self) -> &mut DfuSession<'static, F> {
        &mut self.session
    }

    fn is_ours(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == u8::from(self.iface) as u16
    }
}

impl<B: UsbBus, F: FlashProgrammer> UsbClass<B> for DfuClass<F> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> usb_device::Result<()> {
        writer.interface_alt(
            self.iface,
            0,
            USB_CLASS_APPLICATION_SPECIFIC,
            DFU_SUBCLASS_FIRMWARE_UPGRADE,
            DFU_PROTOCOL_DFU_MODE,
            Some(self.name),
        )?;
        writer.write(DFU_TYPE_FUNCTIONAL, &functional_descriptor(DFU_TRANSFER_SIZE))
    }

    fn get_string(&self, index: StringIndex, _lang_id: LangID) -> Option<&str> {
        (index == self.name).then_some(INTERFACE_NAME)
    }

    fn reset(&mut self) {
        self.session.usb_reset();
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        if !self.is_ours(&req) {
            return;
        }

        let result = match req.request {
            DFU_DNLOAD => self.session.dnload(req.value, xfer.data()),
            DFU_CLRSTATUS => self.session.clear_status(),
            DFU_ABORT => self.session.abort(),
            _ => Err(DfuStatus::ErrStalledPkt),
        };

        match result {
            Ok(()) => {
                xfer.accept().ok();
            }
            Err(status) => {
                defmt::warn!("DFU request 0x{:02x} stalled: {}", req.request, status);
                xfer.reject().ok();
            }
        }
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        if !self.is_ours(&req) {
            return;
        }

        match req.request {
            DFU_GETSTATUS => {
                let record = self.session.get_status();
                xfer.accept_with(&record.to_bytes()).ok();
            }
            DFU_GETSTATE => {
                let state = self.session.get_state();
                xfer.accept_with(&[state as u8]).ok();
            }
            _ => {
                xfer.reject().ok();
            }
        }
    }
}
