//! Console, file and shared-buffer output for resolved lines.

use crate::render::LineRenderer;
use crate::shared::SharedBuffer;
use nowlyric_core::{Lifecycle, Lyric, LyricSink};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writes each rendered line to a file, creating its directory on first use
#[derive(Debug)]
struct OutputFile {
    path: PathBuf,
    dir_ready: bool,
}

impl OutputFile {
    fn write(&mut self, content: &str) -> io::Result<()> {
        if !self.dir_ready {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.dir_ready = true;
        }
        std::fs::write(&self.path, content)
    }
}

/// [`LyricSink`] that renders lines and writes every change to its targets
pub struct LineOutput<W: Write + Send> {
    renderer: LineRenderer,
    writer: W,
    file: Option<OutputFile>,
    shared: Option<SharedBuffer>,
    last_line: Option<String>,
}

impl<W: Write + Send> LineOutput<W> {
    #[must_use]
    pub const fn new(renderer: LineRenderer, writer: W) -> Self {
        Self {
            renderer,
            writer,
            file: None,
            shared: None,
            last_line: None,
        }
    }

    /// Also write each rendered line to `path`
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(OutputFile {
            path: path.into(),
            dir_ready: false,
        });
        self
    }

    /// Also publish each rendered line in `buffer`
    #[must_use]
    pub fn with_shared_buffer(mut self, buffer: SharedBuffer) -> Self {
        self.shared = Some(buffer);
        self
    }

    fn emit(&mut self, out: &str) {
        if let Err(e) = writeln!(self.writer, "{out}").and_then(|()| self.writer.flush()) {
            warn!("Failed to write lyric line: {}", e);
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write(out) {
                warn!("Failed to write {}: {}", file.path.display(), e);
            }
        }

        if let Some(shared) = self.shared.as_ref() {
            if let Err(e) = shared.write(out) {
                warn!("Failed to write {}: {}", shared.path().display(), e);
            }
        }
    }
}

impl<W: Write + Send> LyricSink for LineOutput<W> {
    fn on_line(&mut self, player: &str, line: &str, progress: f64, _lyric: &Lyric) {
        let out = self.renderer.render(line, progress);
        if self.last_line.as_deref() == Some(out.as_str()) {
            return;
        }
        debug!("New output from {}: {:?}", player, out);
        self.emit(&out);
        self.last_line = Some(out);
    }

    fn on_lifecycle(
        &mut self,
        event: Lifecycle,
        player: &str,
        audio_path: Option<&Path>,
        lyric: Option<&Lyric>,
    ) {
        info!(
            "{:?} on {} ({}, {} lyric lines)",
            event,
            player,
            audio_path.map_or_else(|| "no track".to_string(), |p| p.display().to_string()),
            lyric.map_or(0, |l| l.lines().len())
        );
    }
}
