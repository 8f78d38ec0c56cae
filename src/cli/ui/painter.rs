use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::handlers::Rgb;

/// Applies colour and style to terminal text.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    /// Creates a painter with explicit colour control.
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().yellow())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Renders `on`/`off`, green when lit.
    pub(crate) fn power(&self, on: bool) -> String {
        if on {
            self.success("on")
        } else {
            self.muted("off")
        }
    }

    /// Renders an RGB triple, followed by a colour sample on colour terminals.
    pub(crate) fn rgb(&self, rgb: Rgb) -> String {
        let text = rgb.to_string();
        if self.use_colour {
            format!(
                "{} {}",
                text.bold(),
                "  ".on_truecolor(rgb.red, rgb.green, rgb.blue)
            )
        } else {
            text
        }
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}
