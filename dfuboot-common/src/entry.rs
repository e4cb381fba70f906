// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Entry-reason classification - pure logic without hardware dependencies.
//!
//! Decides at every reset whether the boot ROM stays in update mode or
//! hands off to the application. The reset cause is passed in as a snapshot
//! and the button is sampled through a closure, so the decision can be
//! exercised on the host.

/// Snapshot of why the processor last reset. Read once per boot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetCause(u8);

impl ResetCause {
    pub const WATCHDOG: Self = Self(1 << 0);
    pub const POWER_ON: Self = Self(1 << 1);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::WATCHDOG.0 | Self::POWER_ON.0))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn watchdog(self) -> bool {
        self.contains(Self::WATCHDOG)
    }

    pub const fn power_on(self) -> bool {
        self.contains(Self::POWER_ON)
    }
}

/// Why update mode was entered, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateReason {
    /// Nothing safe to jump to.
    InvalidImage,
    /// The application let the watchdog expire to ask for recovery.
    Watchdog,
    /// Power-on with the program button held.
    ButtonHeld,
}

/// Classify the entry reason.
///
/// `sample_button` is called at most once, and only when the decision
/// depends on it (valid image, no watchdog reset, power-on reset).
pub fn classify(
    image_valid: bool,
    cause: ResetCause,
    sample_button: impl FnOnce() -> bool,
) -> Option<UpdateReason> {
    if !image_valid {
        return Some(UpdateReason::InvalidImage);
    }
    if cause.watchdog() {
        return Some(UpdateReason::Watchdog);
    }
    if cause.power_on() && sample_button() {
        return Some(UpdateReason::ButtonHeld);
    }
    None
}

/// True if the boot ROM should stay in update mode.
pub fn should_enter_update_mode(
    image_valid: bool,
    cause: ResetCause,
    sample_button: impl FnOnce() -> bool,
) -> bool {
    classify(image_valid, cause, sample_button).is_some()
}
