// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the entry-reason classifier.

use std::cell::Cell;

use dfuboot_common::layout::{FW_START, RP2040_LAYOUT};
use dfuboot_common::{classify, should_enter_update_mode, ResetCause, UpdateReason, VectorTable};

const ALL_CAUSES: [ResetCause; 4] = [
    ResetCause::empty(),
    ResetCause::WATCHDOG,
    ResetCause::POWER_ON,
    ResetCause::WATCHDOG.union(ResetCause::POWER_ON),
];

#[test]
fn test_reset_cause_bits() {
    let both = ResetCause::WATCHDOG.union(ResetCause::POWER_ON);
    assert!(both.watchdog());
    assert!(both.power_on());
    assert!(!ResetCause::empty().watchdog());
    assert!(!ResetCause::WATCHDOG.power_on());
    assert_eq!(ResetCause::from_bits(0xFF), both);
    assert_eq!(ResetCause::from_bits(0).bits(), 0);
}

#[test]
fn test_invalid_image_always_enters_update_mode() {
    for cause in ALL_CAUSES {
        for button in [false, true] {
            assert_eq!(
                classify(false, cause, || button),
                Some(UpdateReason::InvalidImage)
            );
        }
    }
}

#[test]
fn test_invalid_image_does_not_sample_button() {
    let sampled = Cell::new(false);
    classify(false, ResetCause::POWER_ON, || {
        sampled.set(true);
        true
    });
    assert!(!sampled.get());
}

#[test]
fn test_watchdog_reset_enters_update_mode_regardless_of_button() {
    for cause in [
        ResetCause::WATCHDOG,
        ResetCause::WATCHDOG.union(ResetCause::POWER_ON),
    ] {
        for button in [false, true] {
            assert!(should_enter_update_mode(true, cause, || button));
            assert_eq!(classify(true, cause, || button), Some(UpdateReason::Watchdog));
        }
    }
}

#[test]
fn test_watchdog_reset_does_not_sample_button() {
    let sampled = Cell::new(false);
    classify(true, ResetCause::WATCHDOG, || {
        sampled.set(true);
        false
    });
    assert!(!sampled.get());
}

#[test]
fn test_power_on_with_button_held_enters_update_mode() {
    assert_eq!(
        classify(true, ResetCause::POWER_ON, || true),
        Some(UpdateReason::ButtonHeld)
    );
}

#[test]
fn test_power_on_without_button_boots_application() {
    assert!(!should_enter_update_mode(true, ResetCause::POWER_ON, || false));
}

#[test]
fn test_button_ignored_without_power_on_reset() {
    let sampled = Cell::new(false);
    let decision = classify(true, ResetCause::empty(), || {
        sampled.set(true);
        true
    });
    assert_eq!(decision, None);
    assert!(!sampled.get());
}

#[test]
fn test_button_sampled_exactly_once_on_power_on() {
    let samples = Cell::new(0);
    classify(true, ResetCause::POWER_ON, || {
        samples.set(samples.get() + 1);
        false
    });
    assert_eq!(samples.get(), 1);
}

#[test]
fn test_scenario_power_on_valid_image_proceeds_to_application() {
    let vt = VectorTable {
        initial_sp: 0x2000_1000,
        reset_vector: FW_START + 4,
    };
    let valid = vt.is_valid(&RP2040_LAYOUT);
    assert!(valid);
    assert!(!should_enter_update_mode(valid, ResetCause::POWER_ON, || false));
}

#[test]
fn test_scenario_watchdog_valid_image_enters_update_mode() {
    let vt = VectorTable {
        initial_sp: 0x2000_1000,
        reset_vector: FW_START + 4,
    };
    let valid = vt.is_valid(&RP2040_LAYOUT);
    for button in [false, true] {
        assert!(should_enter_update_mode(valid, ResetCause::WATCHDOG, || button));
    }
}
