use std::fmt::{self, Display, Formatter};

use crate::cli::offline::{DecodeReport, EffectEntry};
use crate::notification::ParsedStatus;
use crate::utils::format_optional;

use super::painter::Painter;
use super::table::Table;

/// Renders the effect catalog as an index/name grid.
pub(crate) struct EffectsView<'a> {
    entries: &'a [EffectEntry],
    painter: &'a Painter,
}

impl<'a> EffectsView<'a> {
    pub(crate) fn new(entries: &'a [EffectEntry], painter: &'a Painter) -> Self {
        Self { entries, painter }
    }
}

impl Display for EffectsView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .entries
            .iter()
            .map(|entry| {
                vec![
                    self.painter.muted(entry.index.to_string()),
                    self.painter.value(entry.name),
                ]
            })
            .collect();
        write!(f, "{}", Table::grid(["index", "effect"], rows))
    }
}

/// Renders a decoded notification as a key-value table.
pub(crate) struct DecodeView<'a> {
    report: &'a DecodeReport,
    painter: &'a Painter,
}

impl<'a> DecodeView<'a> {
    pub(crate) fn new(report: &'a DecodeReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for DecodeView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let painter = self.painter;
        let frame = if self.report.frame_valid {
            painter.success("valid")
        } else {
            painter.warning("invalid")
        };
        let mut rows = vec![
            ("length", painter.value(self.report.length.to_string())),
            ("frame", frame),
        ];

        match &self.report.decoded {
            None => rows.push(("status", painter.warning("ignored"))),
            Some(ParsedStatus::White(white)) => {
                rows.push(("status", painter.value("white")));
                rows.push(("power", painter.power(white.on)));
                rows.push(("brightness", painter.value(format_optional(white.brightness))));
            }
            Some(ParsedStatus::Color(color)) => {
                rows.push(("status", painter.value("colour")));
                rows.push(("power", painter.power(color.on)));
                rows.push(("brightness", painter.value(format_optional(color.brightness))));
                rows.push(("rgb", painter.rgb(color.rgb)));
                rows.push(("effect", painter.value(format_optional(color.effect))));
            }
            Some(ParsedStatus::FullyOff) => rows.push(("status", painter.value("fully off"))),
            Some(ParsedStatus::ShuttingDown) => {
                rows.push(("status", painter.warning("shutting down")));
            }
        }

        write!(f, "{}", Table::key_value(painter, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Brightness;
    use crate::notification::WhiteStatus;

    #[test]
    fn decode_view_marks_ignored_payloads() {
        let painter = Painter::new(false);
        let report = DecodeReport {
            length: 4,
            frame_valid: false,
            decoded: None,
        };
        let rendered = DecodeView::new(&report, &painter).to_string();
        assert!(rendered.contains("ignored"));
        assert!(rendered.contains("invalid"));
    }

    #[test]
    fn decode_view_shows_white_brightness() {
        let painter = Painter::new(false);
        let report = DecodeReport {
            length: 15,
            frame_valid: true,
            decoded: Some(ParsedStatus::White(WhiteStatus {
                on: true,
                brightness: Some(Brightness::new(130)),
            })),
        };
        let rendered = DecodeView::new(&report, &painter).to_string();
        assert!(rendered.contains("130"));
        assert!(rendered.contains("white"));
    }
}
