//! Command line interface.

use clap::{Args, Parser, Subcommand};
use nowlyric_core::NowLyricConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nowlyric", version, about = "Synchronized LRC lyrics for MPRIS media players")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the playing track and print its current lyric line
    Print(PrintArgs),
    /// Print the line currently held in the shared buffer
    Read(ReadArgs),
}

/// Flags for `print`; each one given overrides the config file
#[derive(Debug, Default, Args)]
pub struct PrintArgs {
    /// Content written to the shared buffer at start-up
    #[arg(short = 'c', long)]
    pub default_content: Option<String>,

    /// Lyric poll interval in milliseconds
    #[arg(short = 'd', long = "delay", value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Print debug logs to stderr
    #[arg(short = 'l', long)]
    pub with_log: bool,

    /// Only display the translation (text after the first double space)
    #[arg(short = 't', long)]
    pub only_translation: bool,

    /// Wrap played and unplayed text in <span foreground='color'> markup
    #[arg(short = 'r', long)]
    pub rich_text: bool,

    /// Prefix output with <executor.markup.true> for the Executor GNOME Shell extension
    #[arg(short = 'e', long)]
    pub support_execute: bool,

    /// Color of the played part of a rich text line
    #[arg(short = 'p', long, value_name = "COLOR")]
    pub played_text_color: Option<String>,

    /// Color of the unplayed part of a rich text line
    #[arg(short = 'u', long, value_name = "COLOR")]
    pub unplayed_text_color: Option<String>,

    /// Publish the current line in the shared buffer read by `nowlyric read`
    #[arg(short = 's', long)]
    pub shared_memory: bool,

    /// Added to line progress before splitting played from unplayed text
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<f64>,

    /// Also write each line to this file
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Default, Args)]
pub struct ReadArgs {
    /// Shared buffer to read instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

impl PrintArgs {
    /// Apply the given flags on top of `config`
    pub fn apply(&self, config: &mut NowLyricConfig) {
        let output = &mut config.output;
        if let Some(content) = &self.default_content {
            output.default_content.clone_from(content);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.sync.poll_interval_ms = ms;
        }
        output.only_translation |= self.only_translation;
        output.rich_text |= self.rich_text;
        output.support_execute |= self.support_execute;
        output.shared_memory |= self.shared_memory;
        if let Some(color) = &self.played_text_color {
            output.played_text_color.clone_from(color);
        }
        if let Some(color) = &self.unplayed_text_color {
            output.unplayed_text_color.clone_from(color);
        }
        if let Some(offset) = self.offset {
            output.progress_offset = offset;
        }
        if let Some(path) = &self.output_path {
            output.output_path = Some(path.clone());
        }
    }
}
