// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Board revisions and the pin layout each one needs.
//!
//! The set of layouts is closed and known at build time. The boot ROM picks
//! one from its cargo features and passes it down; nothing else branches on
//! the revision.

/// GPIO numbers shared by every revision.
pub const LED_PIN: u8 = 25;
pub const BUTTON_PIN: u8 = 2;
pub const AUX_PIN: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardRevision {
    pub major: u8,
    pub minor: u8,
}

impl BoardRevision {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    const fn before(self, major: u8, minor: u8) -> bool {
        self.major < major || (self.major == major && self.minor < minor)
    }
}

/// How the program button is biased.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonBias {
    /// Enable the internal pull-up.
    InternalPullUp,
    /// The board carries its own pull-up; leave the pad floating.
    External,
}

/// What the auxiliary output pin is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuxOutput {
    None,
    /// Sideband PHY reset, held low so the PHY stays off the bus.
    SidebandReset,
    /// USB port switch, driven high to route the port to this chip.
    UsbSwitch,
}

impl AuxOutput {
    /// Level to drive while in update mode, if the pin is used at all.
    pub const fn level(self) -> Option<bool> {
        match self {
            AuxOutput::None => None,
            AuxOutput::SidebandReset => Some(false),
            AuxOutput::UsbSwitch => Some(true),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinLayout {
    pub button: ButtonBias,
    pub aux: AuxOutput,
}

impl PinLayout {
    pub const fn for_revision(rev: BoardRevision) -> Self {
        if rev.before(0, 3) {
            Self {
                button: ButtonBias::InternalPullUp,
                aux: AuxOutput::None,
            }
        } else if rev.before(0, 6) {
            Self {
                button: ButtonBias::InternalPullUp,
                aux: AuxOutput::SidebandReset,
            }
        } else {
            Self {
                button: ButtonBias::External,
                aux: AuxOutput::UsbSwitch,
            }
        }
    }
}
