//! Device status value types.

use serde::{Deserialize, Serialize};
use zvariant::Type;

/// Set-point used for a cold cycle when the fridge supports freezer mode.
///
/// The set-point byte is a signed encoding on freezer-capable units, so this
/// lands well below zero.
pub const FREEZING_TEMP_SET: u8 = 0xff - 10;

/// Set-point used for a cold cycle on units without freezer mode.
pub const MIN_TEMP_SET: u8 = 0;

/// Control fields of the fridge.
///
/// All flags are carried as the single bytes the device reports (0 or 1).
/// The zero value doubles as the "nothing received yet" sentinel, see
/// [`Settings::is_initial`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub struct Settings {
    /// Power state.
    pub on: u8,
    /// Eco (low power) compressor mode.
    pub eco_mode: u8,
    /// Panel lock.
    pub locked: u8,
    /// Target temperature set-point.
    pub temp_set: u8,
    /// Freezer-mode capability flag.
    pub e5: u8,
}

impl Settings {
    /// Returns true while no real status has been observed.
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on != 0
    }

    pub fn is_eco_mode(&self) -> bool {
        self.eco_mode != 0
    }

    pub fn is_locked(&self) -> bool {
        self.locked != 0
    }

    pub fn freezer_capable(&self) -> bool {
        self.e5 != 0
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = u8::from(on);
        self
    }

    pub fn with_eco_mode(mut self, eco_mode: bool) -> Self {
        self.eco_mode = u8::from(eco_mode);
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = u8::from(locked);
        self
    }

    /// Builds the settings used while cycling the compressor: powered on at
    /// the coldest set-point the unit supports. Other fields are kept.
    pub fn cold_target(&self) -> Self {
        let temp_set = if self.freezer_capable() {
            FREEZING_TEMP_SET
        } else {
            MIN_TEMP_SET
        };

        Self {
            on: 1,
            temp_set,
            ..*self
        }
    }

    /// Set-point in degrees Celsius.
    pub fn target_celsius(&self) -> f64 {
        if self.freezer_capable() {
            f64::from(self.temp_set as i8)
        } else {
            f64::from(self.temp_set)
        }
    }
}

/// Snapshot of the device status as last reported by the device link.
///
/// Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Type)]
pub struct StatusReport {
    pub settings: Settings,
    /// Cabinet temperature in degrees Celsius.
    pub temperature: f64,
}

impl StatusReport {
    pub fn new(settings: Settings, temperature: f64) -> Self {
        Self {
            settings,
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_are_initial() {
        assert!(Settings::default().is_initial());
        assert!(!Settings::default().with_locked(true).is_initial());
    }

    #[test]
    fn single_field_builders_touch_one_field() {
        let base = Settings {
            on: 0,
            eco_mode: 1,
            locked: 0,
            temp_set: 4,
            e5: 1,
        };

        assert_eq!(base.with_on(true), Settings { on: 1, ..base });
        assert_eq!(base.with_eco_mode(false), Settings { eco_mode: 0, ..base });
        assert_eq!(base.with_locked(true), Settings { locked: 1, ..base });
    }

    #[test]
    fn cold_target_uses_freezing_offset_with_capability() {
        let prev = Settings {
            on: 0,
            eco_mode: 1,
            locked: 1,
            temp_set: 20,
            e5: 1,
        };

        let target = prev.cold_target();
        assert_eq!(
            target,
            Settings {
                on: 1,
                temp_set: 0xff - 10,
                ..prev
            }
        );
        assert_eq!(target.target_celsius(), -11.0);
    }

    #[test]
    fn cold_target_uses_minimum_without_capability() {
        let prev = Settings {
            on: 0,
            temp_set: 8,
            ..Settings::default()
        };

        let target = prev.cold_target();
        assert_eq!(target.on, 1);
        assert_eq!(target.temp_set, MIN_TEMP_SET);
        assert_eq!(target.target_celsius(), 0.0);
    }

    #[test]
    fn status_report_serializes_to_json() {
        let report = StatusReport::new(Settings::default().with_on(true), 3.5);
        let json = serde_json::to_value(report).unwrap();

        assert_eq!(json["settings"]["on"], 1);
        assert_eq!(json["temperature"], 3.5);
    }
}
