use serde::Serialize;
use strum_macros::Display;

use crate::effects::EffectCatalog;
use crate::handlers::{Brightness, Rgb};
use crate::notification::{ColorStatus, ParsedStatus, WhiteStatus};

/// Which subsystem the light was last driven or observed in.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// No mode has been commanded or observed yet.
    #[default]
    #[strum(to_string = "unset")]
    Unset,
    /// White reading light.
    #[strum(to_string = "white")]
    White,
    /// RGB mood light.
    #[strum(to_string = "color")]
    Color,
}

/// Follow-up the session must perform after reconciling one notification.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Reconciled {
    /// State changed but is not yet complete enough to report.
    Quiet,
    /// State should be published through the change notifier.
    Publish,
    /// The device announced it is shutting down.
    Shutdown,
}

/// Locally cached model of the light.
///
/// `active_effect` and `active_mode` keep their last observed values while the
/// colour channel is off so they can be restored on the next power-up. RGB and
/// colour brightness follow every colour report, lit or not.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct LightState {
    pub(crate) white_on: bool,
    pub(crate) white_brightness: Option<Brightness>,
    pub(crate) color_on: bool,
    pub(crate) color_brightness: Option<Brightness>,
    pub(crate) rgb_color: Rgb,
    pub(crate) active_effect: Option<&'static str>,
    pub(crate) active_mode: ColorMode,
}

impl LightState {
    /// `true` while either channel is lit.
    pub(crate) fn overall_on(&self) -> bool {
        self.white_on || self.color_on
    }

    /// Forces both channels off, keeping every cached value.
    pub(crate) fn mark_off(&mut self) {
        self.white_on = false;
        self.color_on = false;
    }

    /// Applies a decoded notification.
    pub(crate) fn apply(&mut self, status: &ParsedStatus) -> Reconciled {
        match status {
            ParsedStatus::White(white) => {
                self.apply_white(white);
                Reconciled::Quiet
            }
            ParsedStatus::Color(color) => {
                self.apply_color(color);
                Reconciled::Publish
            }
            ParsedStatus::FullyOff => {
                self.mark_off();
                Reconciled::Publish
            }
            ParsedStatus::ShuttingDown => Reconciled::Shutdown,
        }
    }

    fn apply_white(&mut self, white: &WhiteStatus) {
        self.white_on = white.on;
        if white.on {
            self.white_brightness = white.brightness;
            self.active_mode = ColorMode::White;
        }
    }

    fn apply_color(&mut self, color: &ColorStatus) {
        self.color_on = color.on;
        self.color_brightness = color.brightness;
        self.rgb_color = color.rgb;
        if color.on {
            self.active_mode = ColorMode::Color;
            if let Some(effect) = color.effect {
                self.active_effect = Some(effect);
            }
        }
    }

    pub(crate) fn snapshot(&self, available: bool) -> LightSnapshot {
        LightSnapshot {
            available,
            is_on: self.overall_on(),
            color_mode: self.active_mode,
            white_on: self.white_on,
            white_brightness: self.white_brightness,
            color_on: self.color_on,
            color_brightness: self.color_brightness,
            rgb_color: self.rgb_color,
            effect: self.active_effect.map(str::to_string),
        }
    }
}

/// Serializable point-in-time copy of the observable light state.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct LightSnapshot {
    /// Whether the session currently holds a live connection.
    pub available: bool,
    /// Whether either channel is lit.
    pub is_on: bool,
    /// Last commanded or observed mode.
    pub color_mode: ColorMode,
    /// White channel on flag.
    pub white_on: bool,
    /// White channel brightness on the local scale.
    pub white_brightness: Option<Brightness>,
    /// Colour channel on flag.
    pub color_on: bool,
    /// Colour channel brightness on the local scale.
    pub color_brightness: Option<Brightness>,
    /// Last known RGB value.
    pub rgb_color: Rgb,
    /// Last known effect name.
    pub effect: Option<String>,
}

impl LightSnapshot {
    /// Brightness of whichever channel the current mode drives.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        match self.color_mode {
            ColorMode::White => self.white_brightness,
            ColorMode::Color | ColorMode::Unset => self.color_brightness,
        }
    }

    /// Effect as presented to users: white mode never runs an effect.
    #[must_use]
    pub fn presented_effect(&self) -> Option<&str> {
        match self.color_mode {
            ColorMode::White => Some(EffectCatalog::OFF),
            ColorMode::Color | ColorMode::Unset => self.effect.as_deref(),
        }
    }
}
