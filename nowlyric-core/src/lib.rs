pub mod bus;
pub mod config;
pub mod error;
pub mod lyric;
pub mod media;
pub mod output;
pub mod paths;
pub mod playback;
pub mod poller;
pub mod probe;
pub mod session;
pub mod time;

pub use bus::{ChangedProperties, PlayerBus, PlayerProperties, PlayerSignal};
pub use config::{LoggingConfig, NowLyricConfig, OutputConfig, SyncConfig};
pub use error::{CoreError, Result};
pub use lyric::{ActiveLine, Lyric, LyricLine};
pub use output::{Lifecycle, LyricSink};
pub use playback::PlaybackStatus;
pub use poller::LyricPoller;
pub use probe::{DurationProbe, FfprobeDurationProbe};
pub use session::{Session, SessionSnapshot};
pub use time::DurationExt;
