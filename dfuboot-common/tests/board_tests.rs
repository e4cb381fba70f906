// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for board revision pin layouts.

use dfuboot_common::board::{AuxOutput, BoardRevision, ButtonBias, PinLayout};

#[test]
fn test_early_boards_have_no_aux_output() {
    for minor in 0..3 {
        let layout = PinLayout::for_revision(BoardRevision::new(0, minor));
        assert_eq!(layout.button, ButtonBias::InternalPullUp);
        assert_eq!(layout.aux, AuxOutput::None);
    }
}

#[test]
fn test_mid_boards_hold_sideband_phy_in_reset() {
    for minor in 3..6 {
        let layout = PinLayout::for_revision(BoardRevision::new(0, minor));
        assert_eq!(layout.button, ButtonBias::InternalPullUp);
        assert_eq!(layout.aux, AuxOutput::SidebandReset);
    }
}

#[test]
fn test_current_boards_take_usb_switch() {
    for rev in [BoardRevision::new(0, 6), BoardRevision::new(0, 7), BoardRevision::new(1, 0)] {
        let layout = PinLayout::for_revision(rev);
        assert_eq!(layout.button, ButtonBias::External);
        assert_eq!(layout.aux, AuxOutput::UsbSwitch);
    }
}

#[test]
fn test_aux_levels() {
    assert_eq!(AuxOutput::None.level(), None);
    assert_eq!(AuxOutput::SidebandReset.level(), Some(false));
    assert_eq!(AuxOutput::UsbSwitch.level(), Some(true));
}

#[test]
fn test_revision_ordering() {
    assert!(BoardRevision::new(0, 5) < BoardRevision::new(0, 6));
    assert!(BoardRevision::new(0, 9) < BoardRevision::new(1, 0));
}
