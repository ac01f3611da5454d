use crate::bus::{PlayerBus, PlayerProperties, PlayerSignal, MPRIS_OBJECT_PATH};
use crate::lyric::Lyric;
use crate::media::{is_audio_file, local_path_from_url, lyric_path_for};
use crate::output::{Lifecycle, LyricSink};
use crate::playback::PlaybackStatus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Everything the session knows about the tracked player
#[derive(Debug, Default)]
struct SessionState {
    /// Unique bus name of the tracked player; empty until a track is seen
    active_player: String,
    playing: bool,
    audio_path: Option<PathBuf>,
    lyric: Option<Lyric>,
    properties: PlayerProperties,
    /// Bumped on every track change so that slow loads for an older track are dropped
    generation: u64,
}

/// Read-only copy of the session state
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub active_player: String,
    pub playing: bool,
    pub audio_path: Option<PathBuf>,
    pub lyric: Option<Lyric>,
    pub properties: PlayerProperties,
}

/// Player session: which player is tracked, which lyric is loaded, and whether it is playing.
///
/// Bus signal handling and the poll loop both go through the same mutex, and a
/// new [`Lyric`] is swapped in as a whole value, so a tick never sees a
/// partially replaced lyric. Slow bus and probe calls run outside the lock.
pub struct Session {
    state: Mutex<SessionState>,
    bus: Arc<dyn PlayerBus>,
    probe: Arc<dyn crate::probe::DurationProbe>,
    sink: Mutex<Box<dyn LyricSink>>,
}

impl Session {
    /// Create a new session with no player and no lyric
    #[must_use]
    pub fn new(
        bus: Arc<dyn PlayerBus>,
        probe: Arc<dyn crate::probe::DurationProbe>,
        sink: Box<dyn LyricSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SessionState::default()),
            bus,
            probe,
            sink: Mutex::new(sink),
        })
    }

    /// React to a property-change signal from the bus
    pub async fn handle_signal(&self, signal: PlayerSignal) {
        if !signal.path.starts_with(MPRIS_OBJECT_PATH) {
            debug!("Signal path {} is not an MPRIS path, skipping", signal.path);
            return;
        }

        if let Some(url) = signal.changed.metadata_url.as_deref() {
            debug!("Metadata xesam:url = {}", url);
            match local_path_from_url(url) {
                Some(path) if is_audio_file(&path) => {
                    self.on_track_changed(&signal.sender, &path).await;
                }
                Some(path) => {
                    debug!("File is not a recognized audio file: {}", path.display());
                }
                None => {
                    debug!("Track URL is not a local file: {}", url);
                }
            }
        }

        if let Some(status) = signal.changed.playback_status.as_deref() {
            self.on_status_changed(&signal.sender, status).await;
        }
    }

    /// A new audio file started on `player`.
    ///
    /// `player` becomes the tracked player. If a sibling `.lrc` file exists, the
    /// track is probed and the lyric replaced; any failure leaves the previous
    /// lyric in place.
    pub async fn on_track_changed(&self, player: &str, audio_path: &Path) {
        let generation = {
            let mut state = self.state.lock().await;
            state.active_player = player.to_string();
            state.audio_path = Some(audio_path.to_path_buf());
            state.generation += 1;
            state.generation
        };

        let lyric_path = lyric_path_for(audio_path);
        debug!("Looking for lyric file: {}", lyric_path.display());
        if !tokio::fs::try_exists(&lyric_path).await.unwrap_or(false) {
            warn!("Lyric file not found: {}", lyric_path.display());
            return;
        }

        let properties = match self.bus.all_properties(player).await {
            Ok(properties) => {
                debug!("Fetched {} properties from {}", properties.len(), player);
                Some(properties)
            }
            Err(e) => {
                warn!("Failed to get all properties from {}: {}", player, e);
                None
            }
        };

        let duration_us = match self.probe.probe_duration(audio_path).await {
            Ok(duration_us) => duration_us,
            Err(e) => {
                error!("Failed to get song duration: {}", e);
                return;
            }
        };

        let lyric = match Lyric::load(&lyric_path, duration_us).await {
            Ok(lyric) => lyric,
            Err(e) => {
                error!("Failed to parse lyric file {}: {}", lyric_path.display(), e);
                return;
            }
        };

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                "Track changed while loading {}, discarding",
                lyric_path.display()
            );
            return;
        }
        info!(
            "Loaded lyric file: {} ({} lines)",
            lyric_path.display(),
            lyric.lines().len()
        );
        state.lyric = Some(lyric);
        if let Some(properties) = properties {
            state.properties = properties;
        }
    }

    /// `player` reported a new playback status.
    ///
    /// Only the tracked player may change the playing flag.
    pub async fn on_status_changed(&self, player: &str, status: &str) {
        let mut state = self.state.lock().await;
        if state.active_player != player {
            debug!(
                "Signal sender {} is not the current player {:?}, skipping",
                player, state.active_player
            );
            return;
        }

        let status: PlaybackStatus = match status.parse() {
            Ok(status) => status,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        info!("PlaybackStatus changed: {} ({})", status, player);
        state.playing = status.is_playing();

        self.sink.lock().await.on_lifecycle(
            Lifecycle::from(status),
            player,
            state.audio_path.as_deref(),
            state.lyric.as_ref(),
        );
    }

    /// One poll tick: resolve the tracked player's position and forward the line.
    ///
    /// Does nothing while paused or without a lyric. Position query failures skip the tick.
    /// Without a lyric the position is not queried at all.
    pub async fn tick(&self) {
        let player = {
            let state = self.state.lock().await;
            if !state.playing || state.lyric.is_none() {
                return;
            }
            state.active_player.clone()
        };

        let position_us = match self.bus.position(&player).await {
            Ok(position_us) => position_us,
            Err(e) => {
                warn!("Failed to get playback position: {}", e);
                return;
            }
        };

        let mut state = self.state.lock().await;
        if state.active_player != player || !state.playing {
            return;
        }
        let Some(lyric) = state.lyric.as_mut() else {
            return;
        };

        let (line, progress) = lyric.resolve(position_us);
        let line = line.to_string();
        debug!("Current lyric line: {:?} ({:.3})", line, progress);

        self.sink
            .lock()
            .await
            .on_line(&player, &line, progress, lyric);
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            active_player: state.active_player.clone(),
            playing: state.playing,
            audio_path: state.audio_path.clone(),
            lyric: state.lyric.clone(),
            properties: state.properties.clone(),
        }
    }

    /// Check if the tracked player is playing
    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.playing
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bus::ChangedProperties;
    use crate::error::{CoreError, Result};
    use crate::probe::DurationProbe;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    pub const SECOND: u64 = 1_000_000;

    /// Bus returning a settable position, or failing when the position is `u64::MAX`
    #[derive(Default)]
    pub struct FakeBus {
        pub position_us: AtomicU64,
        pub position_calls: AtomicUsize,
        pub property_calls: AtomicUsize,
        pub fail_properties: bool,
    }

    #[async_trait]
    impl PlayerBus for FakeBus {
        async fn position(&self, _player: &str) -> Result<u64> {
            self.position_calls.fetch_add(1, Ordering::SeqCst);
            match self.position_us.load(Ordering::SeqCst) {
                u64::MAX => Err(CoreError::Bus {
                    reason: "no reply".into(),
                }),
                position => Ok(position),
            }
        }

        async fn all_properties(&self, _player: &str) -> Result<PlayerProperties> {
            self.property_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_properties {
                return Err(CoreError::BusTimeout { timeout_ms: 10 });
            }
            Ok(PlayerProperties::from([(
                "PlaybackStatus".to_string(),
                "Playing".to_string(),
            )]))
        }
    }

    pub struct FakeProbe {
        pub duration_us: Option<u64>,
        pub calls: AtomicUsize,
    }

    impl FakeProbe {
        pub fn returning(duration_us: u64) -> Self {
            Self {
                duration_us: Some(duration_us),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                duration_us: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DurationProbe for FakeProbe {
        async fn probe_duration(&self, path: &Path) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.duration_us.ok_or_else(|| CoreError::ProbeFailed {
                path: path.to_path_buf(),
                reason: "unsupported format".into(),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Line {
            player: String,
            line: String,
            progress: f64,
        },
        Lifecycle {
            event: Lifecycle,
            player: String,
            has_lyric: bool,
        },
    }

    /// Sink that records everything it receives into a shared log
    #[derive(Clone, Default)]
    pub struct RecordingSink(pub Arc<StdMutex<Vec<Recorded>>>);

    impl RecordingSink {
        pub fn take(&self) -> Vec<Recorded> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl LyricSink for RecordingSink {
        fn on_line(&mut self, player: &str, line: &str, progress: f64, _lyric: &Lyric) {
            self.0.lock().unwrap().push(Recorded::Line {
                player: player.to_string(),
                line: line.to_string(),
                progress,
            });
        }

        fn on_lifecycle(
            &mut self,
            event: Lifecycle,
            player: &str,
            _audio_path: Option<&Path>,
            lyric: Option<&Lyric>,
        ) {
            self.0.lock().unwrap().push(Recorded::Lifecycle {
                event,
                player: player.to_string(),
                has_lyric: lyric.is_some(),
            });
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        bus: Arc<FakeBus>,
        probe: Arc<FakeProbe>,
        sink: RecordingSink,
        session: Arc<Session>,
    }

    fn fixture_with(bus: FakeBus, probe: FakeProbe) -> Fixture {
        let bus = Arc::new(bus);
        let probe = Arc::new(probe);
        let sink = RecordingSink::default();
        let session = Session::new(bus.clone(), probe.clone(), Box::new(sink.clone()));
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            bus,
            probe,
            sink,
            session,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeBus::default(), FakeProbe::returning(30 * SECOND))
    }

    impl Fixture {
        /// Create an empty audio file and, optionally, its lyric file
        fn track(&self, name: &str, lrc: Option<&str>) -> PathBuf {
            let audio = self.dir.path().join(name);
            std::fs::write(&audio, b"").unwrap();
            if let Some(lrc) = lrc {
                std::fs::write(lyric_path_for(&audio), lrc).unwrap();
            }
            audio
        }
    }

    fn signal(sender: &str, url: Option<String>, status: Option<&str>) -> PlayerSignal {
        PlayerSignal {
            path: MPRIS_OBJECT_PATH.to_string(),
            sender: sender.to_string(),
            changed: ChangedProperties {
                metadata_url: url,
                playback_status: status.map(str::to_string),
            },
        }
    }

    fn file_url(path: &Path) -> String {
        url::Url::from_file_path(path).unwrap().to_string()
    }

    const LRC: &str = "[00:10.00]Line A\n[00:20.00]Line B";

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let f = fixture();
        let snapshot = f.session.snapshot().await;
        assert!(snapshot.active_player.is_empty());
        assert!(!snapshot.playing);
        assert!(snapshot.lyric.is_none());
    }

    #[tokio::test]
    async fn test_track_change_loads_lyric() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));

        f.session.on_track_changed(":1.42", &audio).await;

        let snapshot = f.session.snapshot().await;
        assert_eq!(snapshot.active_player, ":1.42");
        assert_eq!(snapshot.audio_path, Some(audio));
        let lyric = snapshot.lyric.unwrap();
        assert_eq!(lyric.lines().len(), 2);
        assert_eq!(lyric.duration_us(), 30 * SECOND);
        assert_eq!(
            snapshot.properties.get("PlaybackStatus").map(String::as_str),
            Some("Playing")
        );
        assert_eq!(f.probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_track_without_lyric_file_skips_probe() {
        let f = fixture();
        let audio = f.track("song.mp3", None);

        f.session.on_track_changed(":1.42", &audio).await;

        let snapshot = f.session.snapshot().await;
        assert_eq!(snapshot.active_player, ":1.42");
        assert!(snapshot.lyric.is_none());
        assert_eq!(f.probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.bus.property_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_track_without_lyric_file_keeps_previous_lyric() {
        let f = fixture();
        let first = f.track("first.mp3", Some(LRC));
        let second = f.track("second.mp3", None);

        f.session.on_track_changed(":1.42", &first).await;
        f.session.on_track_changed(":1.42", &second).await;

        let lyric = f.session.snapshot().await.lyric.unwrap();
        assert_eq!(lyric.lines()[0].text, "Line A");
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_previous_lyric() {
        let f = fixture_with(FakeBus::default(), FakeProbe::failing());
        let audio = f.track("song.ogg", Some(LRC));

        f.session.on_track_changed(":1.42", &audio).await;

        assert!(f.session.snapshot().await.lyric.is_none());
        assert_eq!(f.probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_property_fetch_failure_is_not_fatal() {
        let bus = FakeBus {
            fail_properties: true,
            ..FakeBus::default()
        };
        let f = fixture_with(bus, FakeProbe::returning(30 * SECOND));
        let audio = f.track("song.opus", Some(LRC));

        f.session.on_track_changed(":1.42", &audio).await;

        let snapshot = f.session.snapshot().await;
        assert!(snapshot.lyric.is_some());
        assert!(snapshot.properties.is_empty());
    }

    #[tokio::test]
    async fn test_handle_signal_track_then_status() {
        let f = fixture();
        let audio = f.track("My Song.flac", Some(LRC));

        f.session
            .handle_signal(signal(":1.7", Some(file_url(&audio)), Some("Playing")))
            .await;

        let snapshot = f.session.snapshot().await;
        assert_eq!(snapshot.active_player, ":1.7");
        assert!(snapshot.playing);
        assert!(snapshot.lyric.is_some());
        assert_eq!(
            f.sink.take(),
            [Recorded::Lifecycle {
                event: Lifecycle::Play,
                player: ":1.7".into(),
                has_lyric: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_handle_signal_ignores_non_mpris_path() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        let mut sig = signal(":1.7", Some(file_url(&audio)), Some("Playing"));
        sig.path = "/org/freedesktop/Notifications".into();

        f.session.handle_signal(sig).await;

        let snapshot = f.session.snapshot().await;
        assert!(snapshot.active_player.is_empty());
        assert!(!snapshot.playing);
    }

    #[tokio::test]
    async fn test_handle_signal_ignores_non_audio_files() {
        let f = fixture();
        let video = f.track("clip.mkv", Some(LRC));

        f.session
            .handle_signal(signal(":1.7", Some(file_url(&video)), None))
            .await;

        assert!(f.session.snapshot().await.active_player.is_empty());
        assert_eq!(f.probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_signal_ignores_remote_urls() {
        let f = fixture();
        f.session
            .handle_signal(signal(
                ":1.7",
                Some("https://example.com/stream.mp3".into()),
                None,
            ))
            .await;
        assert!(f.session.snapshot().await.active_player.is_empty());
    }

    #[tokio::test]
    async fn test_status_from_other_player_is_ignored() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.session.on_status_changed("B", "Paused").await;

        assert!(f.session.is_playing().await);
        assert_eq!(f.session.snapshot().await.active_player, "A");
        assert!(f.sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_status_before_any_track_is_ignored() {
        let f = fixture();
        f.session.on_status_changed(":1.7", "Playing").await;
        assert!(!f.session.is_playing().await);
        assert!(f.sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_status_without_lyric_still_toggles_playing() {
        let f = fixture();
        let audio = f.track("song.wav", None);
        f.session.on_track_changed("A", &audio).await;

        f.session.on_status_changed("A", "Playing").await;

        assert!(f.session.is_playing().await);
        assert_eq!(
            f.sink.take(),
            [Recorded::Lifecycle {
                event: Lifecycle::Play,
                player: "A".into(),
                has_lyric: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_pause_and_stop_clear_playing() {
        let f = fixture();
        let audio = f.track("song.m4a", Some(LRC));
        f.session.on_track_changed("A", &audio).await;

        f.session.on_status_changed("A", "Playing").await;
        f.session.on_status_changed("A", "Paused").await;
        assert!(!f.session.is_playing().await);
        f.session.on_status_changed("A", "Playing").await;
        f.session.on_status_changed("A", "Stopped").await;
        assert!(!f.session.is_playing().await);

        let events: Vec<_> = f
            .sink
            .take()
            .into_iter()
            .map(|r| match r {
                Recorded::Lifecycle { event, .. } => event,
                Recorded::Line { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(
            events,
            [
                Lifecycle::Play,
                Lifecycle::Pause,
                Lifecycle::Play,
                Lifecycle::Stop
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_status_changes_nothing() {
        let f = fixture();
        let audio = f.track("song.aac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.session.on_status_changed("A", "Buffering").await;

        assert!(f.session.is_playing().await);
        assert!(f.sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_tick_forwards_resolved_line() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.bus.position_us.store(15 * SECOND, Ordering::SeqCst);
        f.session.tick().await;
        f.bus.position_us.store(25 * SECOND, Ordering::SeqCst);
        f.session.tick().await;

        assert_eq!(
            f.sink.take(),
            [
                Recorded::Line {
                    player: "A".into(),
                    line: "Line A".into(),
                    progress: 0.5,
                },
                Recorded::Line {
                    player: "A".into(),
                    line: "Line B".into(),
                    progress: 0.5,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_tick_does_nothing_when_paused() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Paused").await;
        f.sink.take();

        f.bus.position_us.store(15 * SECOND, Ordering::SeqCst);
        f.session.tick().await;

        assert!(f.sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_tick_without_lyric_skips_position_query() {
        let f = fixture();
        let audio = f.track("song.wav", None);
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.session.tick().await;

        assert!(f.session.is_playing().await);
        assert_eq!(f.bus.position_calls.load(Ordering::SeqCst), 0);
        assert!(f.sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_tick_skips_on_position_failure() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.bus.position_us.store(u64::MAX, Ordering::SeqCst);
        f.session.tick().await;

        assert!(f.sink.take().is_empty());
        assert!(f.session.is_playing().await);
    }

    #[tokio::test]
    async fn test_tick_before_first_line_sends_empty_line() {
        let f = fixture();
        let audio = f.track("song.flac", Some(LRC));
        f.session.on_track_changed("A", &audio).await;
        f.session.on_status_changed("A", "Playing").await;
        f.sink.take();

        f.bus.position_us.store(SECOND, Ordering::SeqCst);
        f.session.tick().await;

        assert_eq!(
            f.sink.take(),
            [Recorded::Line {
                player: "A".into(),
                line: String::new(),
                progress: 0.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_new_track_replaces_lyric_and_resets_cache() {
        let f = fixture();
        let first = f.track("first.flac", Some(LRC));
        let second = f.track("second.flac", Some("[00:01.00]Other\n[00:02.00]Song"));
        f.session.on_track_changed("A", &first).await;
        f.session.on_status_changed("A", "Playing").await;
        f.bus.position_us.store(25 * SECOND, Ordering::SeqCst);
        f.session.tick().await;
        f.sink.take();

        f.session.on_track_changed("A", &second).await;
        f.bus.position_us.store(1_500_000, Ordering::SeqCst);
        f.session.tick().await;

        match f.sink.take().as_slice() {
            [Recorded::Line { line, progress, .. }] => {
                assert_eq!(line, "Other");
                assert!((progress - 0.5).abs() < 1e-9);
            }
            other => panic!("unexpected sink calls: {other:?}"),
        }
    }

    /// Probe that holds `slow.*` tracks until released
    #[derive(Default)]
    struct GatedProbe {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl DurationProbe for GatedProbe {
        async fn probe_duration(&self, path: &Path) -> Result<u64> {
            if path.file_stem().is_some_and(|stem| stem == "slow") {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(30 * SECOND)
        }
    }

    #[tokio::test]
    async fn test_slow_load_does_not_overwrite_newer_track() {
        let probe = Arc::new(GatedProbe::default());
        let f = fixture();
        let session = Session::new(
            Arc::new(FakeBus::default()),
            probe.clone(),
            Box::new(RecordingSink::default()),
        );
        let slow = f.track("slow.mp3", Some("[00:01.00]SLOW"));
        let fast = f.track("fast.mp3", Some("[00:01.00]FAST"));

        let slow_load = tokio::spawn({
            let session = session.clone();
            async move { session.on_track_changed("A", &slow).await }
        });
        probe.entered.notified().await;

        session.on_track_changed("A", &fast).await;
        probe.release.notify_one();
        slow_load.await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.audio_path, Some(fast));
        assert_eq!(snapshot.lyric.unwrap().lines()[0].text, "FAST");
    }
}
