//! Turns a resolved line into the text that is printed.

use nowlyric_core::OutputConfig;
use std::fmt::Write as _;

/// Prefix understood by the Executor GNOME Shell extension as "render markup"
pub const EXECUTOR_PREFIX: &str = "<executor.markup.true>";

/// Separator between the original line and its translation
const TRANSLATION_SEPARATOR: &str = "  ";

/// Plain or Pango-markup rendering of lyric lines
#[derive(Debug, Clone)]
pub struct LineRenderer {
    only_translation: bool,
    rich_text: bool,
    support_execute: bool,
    played_text_color: String,
    unplayed_text_color: String,
    progress_offset: f64,
}

impl LineRenderer {
    #[must_use]
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            only_translation: output.only_translation,
            rich_text: output.rich_text,
            support_execute: output.support_execute,
            played_text_color: output.played_text_color.clone(),
            unplayed_text_color: output.unplayed_text_color.clone(),
            progress_offset: output.progress_offset,
        }
    }

    /// Render `line` at `progress` through it
    #[must_use]
    pub fn render(&self, line: &str, progress: f64) -> String {
        let text = if self.only_translation {
            translation_of(line)
        } else {
            line
        };

        let mut out = String::new();
        if self.support_execute {
            out.push_str(EXECUTOR_PREFIX);
        }

        if self.rich_text {
            let split = played_byte_index(text, progress + self.progress_offset);
            let (played, unplayed) = text.split_at(split);
            // Infallible for String
            let _ = write!(
                out,
                " <span foreground='{}'>{}</span> <span foreground='{}'>{}</span>",
                self.played_text_color,
                escape_markup(played),
                self.unplayed_text_color,
                escape_markup(unplayed),
            );
        } else {
            out.push_str(text);
        }
        out
    }
}

/// Text after the first double space, or the whole line if there is none
fn translation_of(line: &str) -> &str {
    line.find(TRANSLATION_SEPARATOR)
        .map_or(line, |idx| &line[idx + TRANSLATION_SEPARATOR.len()..])
}

/// Byte index splitting the first `floor(chars * fraction)` characters from the rest
fn played_byte_index(text: &str, fraction: f64) -> usize {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    let total = text.chars().count();
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let played = ((total as f64) * fraction).floor() as usize;
    text.char_indices()
        .nth(played)
        .map_or(text.len(), |(idx, _)| idx)
}

fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
