use std::fmt::{self, Display, Formatter};

use btleplug::api::BDAddr;

use crate::light::LightSnapshot;
use crate::utils::format_optional;

use super::painter::Painter;
use super::table::Table;

/// Renders a [`LightSnapshot`] as a key-value table.
pub(crate) struct LightView<'a> {
    mac: BDAddr,
    snapshot: &'a LightSnapshot,
    painter: &'a Painter,
}

impl<'a> LightView<'a> {
    pub(crate) fn new(mac: BDAddr, snapshot: &'a LightSnapshot, painter: &'a Painter) -> Self {
        Self {
            mac,
            snapshot,
            painter,
        }
    }
}

impl Display for LightView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;
        let painter = self.painter;
        let available = if snapshot.available {
            painter.success("yes")
        } else {
            painter.warning("no")
        };
        let table = Table::key_value(
            painter,
            vec![
                ("mac", painter.value(self.mac.to_string())),
                ("available", available),
                ("power", painter.power(snapshot.is_on)),
                ("mode", painter.value(snapshot.color_mode.to_string())),
                (
                    "brightness",
                    painter.value(format_optional(snapshot.brightness())),
                ),
                ("white", painter.power(snapshot.white_on)),
                (
                    "white_brightness",
                    painter.value(format_optional(snapshot.white_brightness)),
                ),
                ("colour", painter.power(snapshot.color_on)),
                (
                    "colour_brightness",
                    painter.value(format_optional(snapshot.color_brightness)),
                ),
                ("rgb", painter.rgb(snapshot.rgb_color)),
                (
                    "effect",
                    painter.value(format_optional(snapshot.presented_effect())),
                ),
            ],
        );
        write!(f, "{table}")
    }
}

/// One-line rendering of a state change for `watch`.
pub(crate) struct WatchLineView<'a> {
    index: usize,
    snapshot: &'a LightSnapshot,
    painter: &'a Painter,
}

impl<'a> WatchLineView<'a> {
    pub(crate) fn new(index: usize, snapshot: &'a LightSnapshot, painter: &'a Painter) -> Self {
        Self {
            index,
            snapshot,
            painter,
        }
    }
}

impl Display for WatchLineView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;
        let painter = self.painter;
        let prefix = painter.heading(format!("[{}]", self.index));
        if !snapshot.available {
            return write!(f, "{prefix} {}", painter.warning("unavailable"));
        }
        write!(
            f,
            "{prefix} {} mode={} brightness={} rgb={} effect={}",
            painter.power(snapshot.is_on),
            snapshot.color_mode,
            format_optional(snapshot.brightness()),
            painter.rgb(snapshot.rgb_color),
            format_optional(snapshot.presented_effect()),
        )
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::handlers::{Brightness, Rgb};
    use crate::light::ColorMode;

    fn snapshot(available: bool) -> LightSnapshot {
        LightSnapshot {
            available,
            is_on: true,
            color_mode: ColorMode::Color,
            white_on: false,
            white_brightness: None,
            color_on: true,
            color_brightness: Some(Brightness::new(128)),
            rgb_color: Rgb::new(10, 20, 30),
            effect: Some("Wave".to_string()),
        }
    }

    #[test]
    fn watch_line_summarises_state() {
        let painter = Painter::new(false);
        let state = snapshot(true);
        assert_snapshot!(
            WatchLineView::new(3, &state, &painter).to_string(),
            @"[3] on mode=color brightness=128 rgb=(10, 20, 30) effect=Wave"
        );
    }

    #[test]
    fn watch_line_reports_unavailable() {
        let painter = Painter::new(false);
        let state = snapshot(false);
        assert_snapshot!(
            WatchLineView::new(1, &state, &painter).to_string(),
            @"[1] unavailable"
        );
    }

    #[test]
    fn light_view_lists_every_field() {
        let painter = Painter::new(false);
        let state = snapshot(true);
        let rendered = LightView::new(BDAddr::from([0xA4, 0xC1, 0x38, 0, 0, 1]), &state, &painter)
            .to_string();
        for field in ["mac", "available", "power", "mode", "rgb", "effect"] {
            assert!(rendered.contains(field), "missing {field} in {rendered}");
        }
        assert!(rendered.contains("A4:C1:38:00:00:01"));
    }
}
