// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the DFU request state machine.

mod support;

use dfuboot_common::{DfuSession, DfuState, DfuStatus, DownloadHandler, ExitFlag};
use support::{row_sized_layout, sample_image, small_block_layout, MockFlash};

fn session<'a>(flash: &'a mut MockFlash, exit: &'a ExitFlag) -> DfuSession<'a, &'a mut MockFlash> {
    DfuSession::new(DownloadHandler::new(flash, row_sized_layout(), exit))
}

#[test]
fn test_new_session_is_idle() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    let record = dfu.get_status();
    assert_eq!(record.state, DfuState::DfuIdle);
    assert_eq!(record.status, DfuStatus::Ok);
    assert_eq!(record.poll_timeout_ms, 0);
    assert_eq!(dfu.get_state(), DfuState::DfuIdle);
}

#[test]
fn test_dnload_then_get_status_reaches_dnload_idle() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    assert_eq!(dfu.dnload(0, &[0x42; 256]), Ok(()));
    assert_eq!(dfu.get_state(), DfuState::DnloadSync);
    assert_eq!(dfu.get_status().to_bytes(), [0, 0, 0, 0, 5, 0]);
    assert_eq!(dfu.get_state(), DfuState::DnloadIdle);
}

#[test]
fn test_dnload_splits_block_into_page_packets() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.dnload(2, &[0x42; 200]).unwrap();
    drop(dfu);

    // one erase, then 64 + 64 + 64 + 8
    assert_eq!(flash.erases(), vec![0x2200]);
    assert_eq!(flash.writes(), 4);
    assert_eq!(flash.bytes(0x2200, 200), &[0x42; 200][..]);
}

#[test]
fn test_oversized_block_is_stalled_with_unknown_error() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    assert_eq!(dfu.dnload(0, &[0; 257]), Err(DfuStatus::ErrUnknown));
    let record = dfu.get_status();
    assert_eq!(record.state, DfuState::Error);
    assert_eq!(record.status, DfuStatus::ErrUnknown);
    drop(dfu);
    assert!(flash.ops.is_empty());
}

#[test]
fn test_request_stalled_by_control_pipe_leaves_session_unchanged() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.dnload(0, &[0x42; 256]).unwrap();
    dfu.get_status();

    // A 257-byte DNLOAD of block 1 is stalled in the setup stage and never
    // reaches the session: the host's next GETSTATUS sees the old state.
    let record = dfu.get_status();
    assert_eq!(record.state, DfuState::DnloadIdle);
    assert_eq!(record.status, DfuStatus::Ok);

    // Resending block 1 within wTransferSize carries on
    assert_eq!(dfu.dnload(1, &[0x43; 256]), Ok(()));
    assert_eq!(dfu.get_status().state, DfuState::DnloadIdle);
    drop(dfu);
    assert_eq!(flash.bytes(0x2100, 256), &[0x43; 256][..]);
}

#[test]
fn test_out_of_range_block_is_stalled_with_address_error() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    assert_eq!(dfu.dnload(17, &[0; 16]), Err(DfuStatus::ErrAddress));
    assert_eq!(dfu.status(), DfuStatus::ErrAddress);
    assert_eq!(dfu.get_state(), DfuState::Error);
}

#[test]
fn test_error_blocks_dnload_until_cleared() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.dnload(17, &[0; 16]).unwrap_err();
    assert_eq!(dfu.dnload(0, &[0; 16]), Err(DfuStatus::ErrStalledPkt));

    assert_eq!(dfu.clear_status(), Ok(()));
    assert_eq!(dfu.get_state(), DfuState::DfuIdle);
    assert_eq!(dfu.status(), DfuStatus::Ok);
    assert_eq!(dfu.dnload(0, &[0; 16]), Ok(()));
}

#[test]
fn test_clear_status_outside_error_stalls() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    assert_eq!(dfu.clear_status(), Err(DfuStatus::ErrStalledPkt));
    assert_eq!(dfu.get_state(), DfuState::Error);
}

#[test]
fn test_zero_length_dnload_in_idle_stalls() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    assert_eq!(dfu.dnload(0, &[]), Err(DfuStatus::ErrStalledPkt));
    assert!(!exit.is_raised());
}

#[test]
fn test_dnload_without_get_status_stalls() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.dnload(0, &[0; 16]).unwrap();
    assert_eq!(dfu.dnload(1, &[0; 16]), Err(DfuStatus::ErrStalledPkt));
}

#[test]
fn test_abort_returns_to_idle() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.dnload(0, &[0; 16]).unwrap();
    dfu.get_status();
    assert_eq!(dfu.abort(), Ok(()));
    assert_eq!(dfu.get_state(), DfuState::DfuIdle);
}

#[test]
fn test_abort_in_error_is_refused() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.mark_firmware_corrupt();
    assert_eq!(dfu.abort(), Err(DfuStatus::ErrStalledPkt));
    assert_eq!(dfu.status(), DfuStatus::ErrFirmware);
}

#[test]
fn test_usb_reset_mid_transfer_reports_error() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.usb_reset();
    assert_eq!(dfu.get_state(), DfuState::DfuIdle);

    dfu.dnload(0, &[0; 16]).unwrap();
    dfu.get_status();
    dfu.usb_reset();
    assert_eq!(dfu.get_state(), DfuState::Error);
    assert_eq!(dfu.status(), DfuStatus::ErrUsbReset);
}

#[test]
fn test_corrupt_firmware_session_recovers_after_clear() {
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&row_sized_layout());
    let mut dfu = session(&mut flash, &exit);

    dfu.mark_firmware_corrupt();
    let record = dfu.get_status();
    assert_eq!(record.state, DfuState::Error);
    assert_eq!(record.status, DfuStatus::ErrFirmware);

    dfu.clear_status().unwrap();
    assert_eq!(dfu.dnload(0, &[0; 16]), Ok(()));
}

#[test]
fn test_full_session_manifests_and_raises_exit_flag() {
    let layout = row_sized_layout();
    let image = sample_image(&layout, 900);
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&layout);
    let mut dfu = session(&mut flash, &exit);

    for (block, chunk) in image.chunks(256).enumerate() {
        dfu.dnload(block as u16, chunk).unwrap();
        assert_eq!(dfu.get_status().state, DfuState::DnloadIdle);
    }

    assert!(!exit.is_raised());
    dfu.dnload(4, &[]).unwrap();
    assert_eq!(dfu.get_state(), DfuState::ManifestSync);

    let record = dfu.get_status();
    assert_eq!(record.state, DfuState::Manifest);
    assert_eq!(record.status, DfuStatus::Ok);
    assert!(exit.is_raised());
    assert!(dfu.is_manifested());
    assert_eq!(dfu.get_state(), DfuState::ManifestWaitReset);

    // Terminal: nothing more is accepted.
    assert_eq!(dfu.dnload(0, &[0; 16]), Err(DfuStatus::ErrStalledPkt));
    drop(dfu);

    assert_eq!(flash.bytes(layout.region.start, image.len()), &image[..]);
    assert_eq!(flash.unerased_writes, 0);
}

#[test]
fn test_retried_block_inside_a_row_is_rewritten() {
    let layout = small_block_layout();
    let exit = ExitFlag::new();
    let mut flash = MockFlash::for_layout(&layout);
    let mut dfu = DfuSession::new(DownloadHandler::new(&mut flash, layout, &exit));

    dfu.dnload(0, &[0x11; 256]).unwrap();
    dfu.get_status();
    dfu.dnload(1, &[0x00; 256]).unwrap();
    dfu.get_status();
    // Host lost the status reply and sends block 1 again
    dfu.dnload(1, &[0x5A; 256]).unwrap();
    assert_eq!(dfu.get_status().state, DfuState::DnloadIdle);
    drop(dfu);

    assert_eq!(flash.bytes(0x1001_0000, 256), &[0x11; 256][..]);
    assert_eq!(flash.bytes(0x1001_0100, 256), &[0x5A; 256][..]);
    assert_eq!(flash.unerased_writes, 0);
}
