use crate::error::Result;
use crate::time::{micros_ratio, secs_f64_to_micros, MICROS_PER_MIN};
use std::path::Path;

/// A single timed line of lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// When the line starts, in microseconds from track start
    pub timestamp_us: u64,
    pub text: String,
}

/// The line covering a playback position and how far into it playback is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveLine {
    pub index: usize,
    /// Fraction of the line's segment already played. Not clamped: a track
    /// that runs past its probed duration yields values above 1.0.
    pub progress: f64,
}

/// Parsed lyrics for one track, sorted by timestamp.
///
/// Remembers the last resolved line so that a steadily advancing playback
/// position resolves in O(1). The hint never changes results; a `Lyric`
/// replaced wholesale starts with an empty hint.
#[derive(Debug, Clone, Default)]
pub struct Lyric {
    lines: Vec<LyricLine>,
    duration_us: u64,
    cached_index: Option<usize>,
}

impl Lyric {
    /// Parse LRC text into a `Lyric` ending at `duration_us`.
    ///
    /// Every `[mm:ss.xx]` tag on a row yields one line carrying the row's text
    /// with all tags removed. Rows without a tag are dropped.
    #[must_use]
    pub fn parse(input: &str, duration_us: u64) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut lines = Vec::new();

        for row in input.lines() {
            let (timestamps, text) = split_time_tags(row);
            let text = text.trim();
            lines.extend(timestamps.into_iter().map(|timestamp_us| LyricLine {
                timestamp_us,
                text: text.to_string(),
            }));
        }

        // Stable sort keeps ties in file order
        lines.sort_by_key(|l| l.timestamp_us);

        Self {
            lines,
            duration_us,
            cached_index: None,
        }
    }

    /// Read and parse an LRC file.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn load(path: &Path, duration_us: u64) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes), duration_us))
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    /// Total track duration in microseconds
    #[must_use]
    pub const fn duration_us(&self) -> u64 {
        self.duration_us
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line being sung at `position_us`.
    ///
    /// Returns `None` when there are no lines or the position precedes the first one.
    pub fn locate(&mut self, position_us: u64) -> Option<ActiveLine> {
        if self.lines.is_empty() {
            return None;
        }

        if let Some(index) = self.cached_index {
            if let Some(line) = self.lines.get(index) {
                if line.timestamp_us <= position_us && position_us < self.segment_end(index) {
                    return Some(ActiveLine {
                        index,
                        progress: self.progress_in(index, position_us),
                    });
                }
            }
        }

        // First line starting strictly after the position
        let next = self.lines.partition_point(|l| l.timestamp_us <= position_us);
        if next == 0 {
            return None;
        }

        let index = next - 1;
        self.cached_index = Some(index);
        Some(ActiveLine {
            index,
            progress: self.progress_in(index, position_us),
        })
    }

    /// Resolve a position to `(text, progress)`; `("", 0.0)` when no line is active.
    pub fn resolve(&mut self, position_us: u64) -> (&str, f64) {
        match self.locate(position_us) {
            Some(active) => (self.lines[active.index].text.as_str(), active.progress),
            None => ("", 0.0),
        }
    }

    /// End of the segment starting at `index`: the next line, or the track end
    fn segment_end(&self, index: usize) -> u64 {
        self.lines
            .get(index + 1)
            .map_or(self.duration_us, |next| next.timestamp_us)
    }

    fn progress_in(&self, index: usize, position_us: u64) -> f64 {
        let start = self.lines[index].timestamp_us;
        let end = self.segment_end(index);
        if end <= start {
            // Zero-length segment (shared timestamp, or duration not past the line)
            return 1.0;
        }
        micros_ratio(position_us.saturating_sub(start), end - start)
    }
}

/// Strip every `[mm:ss.xx]` tag from a row, returning the tag times and the remaining text.
///
/// Bracketed content that is not a time tag stays in the text.
fn split_time_tags(row: &str) -> (Vec<u64>, String) {
    let mut timestamps = Vec::new();
    let mut text = String::with_capacity(row.len());
    let mut rest = row;

    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            break;
        };

        if let Some(timestamp_us) = parse_timestamp(&after_open[..close]) {
            text.push_str(&rest[..open]);
            timestamps.push(timestamp_us);
            rest = &after_open[close + 1..];
        } else {
            text.push_str(&rest[..=open]);
            rest = after_open;
        }
    }
    text.push_str(rest);

    (timestamps, text)
}

/// Parse the inside of a time tag: `minutes:seconds.fraction`, all ASCII digits
fn parse_timestamp(s: &str) -> Option<u64> {
    let (minutes, seconds) = s.split_once(':')?;
    let (whole, fraction) = seconds.split_once('.')?;

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(minutes) || !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;

    Some(
        minutes
            .saturating_mul(MICROS_PER_MIN)
            .saturating_add(secs_f64_to_micros(seconds)),
    )
}
