//! Terminal styling helpers
//!
//! Colors are only applied when stdout supports them.

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream::Stdout};
use std::fmt::Display;
use terminal_link::Link;

/// Success mark
pub const CHECK: &str = "✓";

/// Failure mark
pub const CROSS: &str = "✗";

const ARROW: &str = "→";

/// Semantic styles for anything displayable
pub trait Stylize: Display {
    /// Bold
    fn emphasis(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.bold())
            .to_string()
    }

    /// Cyan, for names and numbers
    fn accent(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.cyan())
            .to_string()
    }

    /// Dimmed, for secondary information
    fn muted(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.dimmed())
            .to_string()
    }

    /// Green
    fn success(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.green())
            .to_string()
    }

    /// Yellow
    fn warn(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.yellow())
            .to_string()
    }

    /// Red, for failures
    fn error(&self) -> String {
        self.to_string()
            .if_supports_color(Stdout, |t| t.red())
            .to_string()
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.error()
}

/// Dimmed arrow for list items
pub fn arrow() -> String {
    ARROW.muted()
}

/// Spinner used while waiting on the network
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// `text` as a clickable link to `url` where the terminal supports it
pub fn hyperlink(text: &str, url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        Link::new(text, url).to_string()
    } else {
        url.to_string()
    }
}
