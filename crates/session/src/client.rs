use crate::config::SessionConfig;
use crate::sinks::SinkRegistry;
use crate::token::{ConfiguredIssuer, TokenError, TokenIssuer};
use pixelface_core::generic_types::{ParticipantInfo, RemoteTrack, RoomEvent, TrackKind};
use pixelface_core::room_api::{Room, RoomProvider};
use pixelface_core::{SharedMapper, StateMapper};
use pixelface_types::AGENT_STATE_ATTRIBUTE;
use secrecy::ExposeSecret;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Provider lost the transport and is retrying. Local resources are kept.
    Reconnecting,
}

/// What a `connect` call did. The guard outcomes are early returns, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnecting,
    AlreadyConnected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("LIVEKIT_URL is not set")]
    MissingUrl,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("failed to connect to room: {0}")]
    Connect(String),
    #[error("connection attempt cancelled by disconnect")]
    Cancelled,
}

struct Inner {
    status: ConnectionStatus,
    room: Option<Arc<dyn Room>>,
    sinks: SinkRegistry,
    muted: bool,
    last_error: Option<String>,
    pump: Option<tokio::task::JoinHandle<()>>,
    // Bumped whenever a session starts or ends; work tagged with an older
    // value belongs to a dead session and is discarded.
    generation: u64,
}

/// Owns at most one realtime room session and feeds its signals to the
/// [`StateMapper`].
///
/// Cloning gives another handle to the same session.
#[derive(Clone)]
pub struct SessionClient {
    config: Arc<SessionConfig>,
    provider: Arc<dyn RoomProvider>,
    issuer: Arc<dyn TokenIssuer>,
    mapper: SharedMapper,
    inner: Arc<Mutex<Inner>>,
}

impl SessionClient {
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn RoomProvider>,
        issuer: Arc<dyn TokenIssuer>,
        mapper: SharedMapper,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            issuer,
            mapper,
            inner: Arc::new(Mutex::new(Inner {
                status: ConnectionStatus::Disconnected,
                room: None,
                sinks: SinkRegistry::new(),
                muted: false,
                last_error: None,
                pump: None,
                generation: 0,
            })),
        }
    }

    /// Uses the token source the configuration describes.
    pub fn from_config(
        config: SessionConfig,
        provider: Arc<dyn RoomProvider>,
        mapper: SharedMapper,
    ) -> Self {
        let issuer = Arc::new(ConfiguredIssuer::from_config(&config));
        Self::new(config, provider, issuer, mapper)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.status(),
            ConnectionStatus::Connected | ConnectionStatus::Reconnecting
        )
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn active_sinks(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Human-readable message from the last failed `connect`, cleared on retry.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn mapper(&self) -> &SharedMapper {
        &self.mapper
    }

    /// Joins `room_name` as `identity`.
    ///
    /// Token issuance, session negotiation and microphone acquisition run in
    /// that order. A denied microphone leaves the session up but muted. Any
    /// other failure leaves the client fully disconnected.
    pub async fn connect(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<ConnectOutcome, SessionError> {
        let generation = {
            let mut inner = self.lock();
            match inner.status {
                ConnectionStatus::Connecting => {
                    tracing::debug!("connect ignored: already connecting");
                    return Ok(ConnectOutcome::AlreadyConnecting);
                }
                ConnectionStatus::Connected | ConnectionStatus::Reconnecting => {
                    tracing::debug!("connect ignored: already connected");
                    return Ok(ConnectOutcome::AlreadyConnected);
                }
                ConnectionStatus::Disconnected => {}
            }
            inner.status = ConnectionStatus::Connecting;
            inner.last_error = None;
            inner.generation += 1;
            inner.generation
        };

        match self.establish(room_name, identity, generation).await {
            Ok(()) => Ok(ConnectOutcome::Connected),
            Err(e) => {
                let mut inner = self.lock();
                if inner.generation == generation {
                    inner.status = ConnectionStatus::Disconnected;
                }
                if !matches!(e, SessionError::Cancelled) {
                    tracing::error!("connection error: {}", e);
                    inner.last_error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        room_name: &str,
        identity: &str,
        generation: u64,
    ) -> Result<(), SessionError> {
        let url = self.config.url().ok_or(SessionError::MissingUrl)?;
        let token = self.issuer.issue(room_name, identity).await?;

        tracing::info!("connecting to {} as {} in {}", url, identity, room_name);
        let connection = self
            .provider
            .connect(url, token.expose_secret())
            .await
            .map_err(|e| SessionError::Connect(format!("{e:#}")))?;
        let room = connection.room;

        let muted = match room.set_microphone_enabled(true).await {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!("microphone unavailable, continuing without it: {:#}", e);
                true
            }
        };

        let cancelled = {
            let mut inner = self.lock();
            if inner.generation == generation {
                inner.status = ConnectionStatus::Connected;
                inner.room = Some(room.clone());
                inner.muted = muted;
                false
            } else {
                true
            }
        };
        if cancelled {
            room.disconnect().await;
            return Err(SessionError::Cancelled);
        }
        tracing::info!("connected to {}", room_name);

        // An agent that joined before us never sends a connect event.
        if let Some(agent) = room.remote_participants().into_iter().find(|p| p.is_agent()) {
            tracing::info!("agent {} already in room", agent.identity);
            self.with_mapper(|mapper| mapper.on_agent_attributes(&agent.attributes));
        }

        let client = self.clone();
        let mut events = connection.events;
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !client.handle_event(event, generation) {
                    return;
                }
            }
            tracing::info!("room event stream closed");
            client.teardown(generation);
        });

        let mut inner = self.lock();
        if inner.generation == generation {
            inner.pump = Some(pump);
        } else {
            pump.abort();
        }
        Ok(())
    }

    /// Leaves the room and releases every audio sink. Safe to call at any time.
    pub async fn disconnect(&self) {
        let (room, pump) = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.sinks.release_all();
            inner.status = ConnectionStatus::Disconnected;
            inner.muted = false;
            (inner.room.take(), inner.pump.take())
        };

        if let Some(pump) = pump {
            pump.abort();
        }
        match room {
            Some(room) => {
                room.disconnect().await;
                self.with_mapper(StateMapper::on_agent_disconnected);
                tracing::info!("disconnected");
            }
            None => tracing::debug!("disconnect called without an active session"),
        }
    }

    pub async fn toggle_mute(&self) {
        let Some(room) = self.lock().room.clone() else {
            tracing::warn!("cannot toggle microphone: no active session");
            return;
        };

        let enable = !room.is_microphone_enabled();
        match room.set_microphone_enabled(enable).await {
            Ok(()) => {
                self.lock().muted = !enable;
                tracing::info!("microphone {}", if enable { "on" } else { "muted" });
            }
            Err(e) => tracing::error!("failed to toggle microphone: {:#}", e),
        }
    }

    /// Applies one provider event. Returns false once the session is over.
    fn handle_event(&self, event: RoomEvent, generation: u64) -> bool {
        if self.lock().generation != generation {
            return false;
        }

        match event {
            RoomEvent::Connected => tracing::info!("room connected"),
            RoomEvent::Disconnected { reason } => {
                tracing::info!(
                    "room disconnected: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.teardown(generation);
                return false;
            }
            RoomEvent::Reconnecting => {
                tracing::warn!("connection lost, provider is reconnecting");
                self.lock().status = ConnectionStatus::Reconnecting;
            }
            RoomEvent::Reconnected => {
                tracing::info!("reconnected");
                self.lock().status = ConnectionStatus::Connected;
            }
            RoomEvent::ParticipantConnected(participant) => {
                tracing::info!("participant connected: {}", participant.identity);
                if participant.is_agent() {
                    self.with_mapper(|mapper| mapper.on_agent_attributes(&participant.attributes));
                }
            }
            RoomEvent::ParticipantDisconnected(participant) => {
                tracing::info!("participant disconnected: {}", participant.identity);
                let released = self.lock().sinks.release_participant(&participant.identity);
                if released > 0 {
                    tracing::debug!("released {} sinks of {}", released, participant.identity);
                }
                if participant.is_agent() {
                    self.with_mapper(StateMapper::on_agent_disconnected);
                }
            }
            RoomEvent::ParticipantAttributesChanged {
                changed,
                participant,
            } => {
                if participant.is_agent() && changed.contains_key(AGENT_STATE_ATTRIBUTE) {
                    self.with_mapper(|mapper| mapper.on_agent_attributes(&changed));
                }
            }
            RoomEvent::TrackSubscribed { track, participant } => {
                self.on_track_subscribed(track, participant);
            }
            RoomEvent::TrackUnsubscribed { track, participant } => {
                if track.kind == TrackKind::Audio {
                    let key = track.sink_key(participant.as_ref());
                    if !self.lock().sinks.release(&key) {
                        tracing::debug!("no sink registered for {}", key);
                    }
                }
            }
            RoomEvent::DataReceived {
                payload,
                participant,
                topic,
            } => match participant {
                Some(sender) if !sender.is_local => {
                    tracing::debug!("data from {} (topic {:?})", sender.identity, topic);
                    self.with_mapper(|mapper| mapper.on_data(&payload));
                }
                _ => tracing::debug!("ignoring data message without a remote sender"),
            },
            RoomEvent::ActiveSpeakersChanged(speakers) => {
                tracing::debug!("active speakers: {:?}", speakers);
            }
        }
        true
    }

    fn on_track_subscribed(&self, track: RemoteTrack, participant: Option<ParticipantInfo>) {
        if track.kind != TrackKind::Audio {
            return;
        }
        let Some(participant) = participant.filter(|p| !p.is_local) else {
            return;
        };
        let Some(room) = self.lock().room.clone() else {
            return;
        };

        let key = track.sink_key(Some(&participant));
        // A repeat subscribe must not leave the old sink's stop behind the new play.
        if self.lock().sinks.release(&key) {
            tracing::debug!("replacing audio sink for {}", key);
        }
        let mut sink = match room.attach_audio(&track, &participant) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!("failed to attach audio track {}: {:#}", key, e);
                return;
            }
        };
        match sink.play() {
            Ok(()) => tracing::info!("audio playback started: {}", key),
            Err(e) => tracing::error!("failed to play audio track {}: {:#}", key, e),
        }
        self.lock().sinks.insert(&key, &participant.identity, sink);
    }

    /// The provider ended the session on its own.
    fn teardown(&self, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.generation += 1;
            inner.sinks.release_all();
            inner.status = ConnectionStatus::Disconnected;
            inner.muted = false;
            inner.room = None;
            // The pump is the caller here; dropping its handle detaches it.
            inner.pump = None;
        }
        self.with_mapper(StateMapper::on_agent_disconnected);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_mapper(&self, f: impl FnOnce(&mut StateMapper)) {
        let mut mapper = self.mapper.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut mapper);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::tests::RecordingSink;
    use crate::token::MockTokenIssuer;
    use async_trait::async_trait;
    use pixelface_core::ToolCallDispatcher;
    use pixelface_core::generic_types::ParticipantKind;
    use pixelface_core::room_api::{AudioSink, RoomConnection};
    use pixelface_types::{EmotionState, SequenceRandom};
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRoom {
        mic_denied: bool,
        mic_enabled: AtomicBool,
        participants: Mutex<Vec<ParticipantInfo>>,
        sinks: Mutex<Vec<(String, RecordingSink)>>,
        /// Attaches made while an older sink for the same key was still playing.
        overlapping: AtomicUsize,
        disconnects: AtomicUsize,
    }

    impl FakeRoom {
        fn sink(&self, key: &str) -> RecordingSink {
            let sinks = self.sinks.lock().unwrap();
            sinks.iter().find(|(k, _)| k == key).unwrap().1.clone()
        }
    }

    #[async_trait]
    impl Room for FakeRoom {
        async fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }

        async fn set_microphone_enabled(&self, enabled: bool) -> anyhow::Result<()> {
            if self.mic_denied {
                anyhow::bail!("permission denied");
            }
            self.mic_enabled.store(enabled, Ordering::SeqCst);
            Ok(())
        }

        fn is_microphone_enabled(&self) -> bool {
            self.mic_enabled.load(Ordering::SeqCst)
        }

        fn remote_participants(&self) -> Vec<ParticipantInfo> {
            self.participants.lock().unwrap().clone()
        }

        fn attach_audio(
            &self,
            track: &RemoteTrack,
            participant: &ParticipantInfo,
        ) -> anyhow::Result<Box<dyn AudioSink>> {
            let sink = RecordingSink::default();
            let key = track.sink_key(Some(participant));
            let mut sinks = self.sinks.lock().unwrap();
            if sinks.iter().any(|(k, s)| *k == key && s.is_playing()) {
                self.overlapping.fetch_add(1, Ordering::SeqCst);
            }
            sinks.push((key, sink.clone()));
            Ok(Box::new(sink))
        }
    }

    struct FakeProvider {
        room: Arc<FakeRoom>,
        events: Mutex<Option<tokio::sync::mpsc::Receiver<RoomEvent>>>,
        connects: AtomicUsize,
    }

    #[async_trait]
    impl RoomProvider for FakeProvider {
        async fn connect(&self, _url: &str, token: &str) -> anyhow::Result<RoomConnection> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(token == "token", "bad token");
            let events = self
                .events
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| anyhow::anyhow!("already connected once"))?;
            Ok(RoomConnection {
                room: self.room.clone(),
                events,
            })
        }
    }

    /// Token issuer that waits for the test to open the gate.
    struct GatedIssuer {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl TokenIssuer for GatedIssuer {
        async fn issue(&self, _room: &str, _identity: &str) -> Result<SecretString, TokenError> {
            self.gate.notified().await;
            Ok(SecretString::from("token".to_string()))
        }
    }

    struct Harness {
        client: SessionClient,
        provider: Arc<FakeProvider>,
        room: Arc<FakeRoom>,
        events: tokio::sync::mpsc::Sender<RoomEvent>,
    }

    impl Harness {
        fn emotion(&self) -> EmotionState {
            self.client.mapper().lock().unwrap().emotion()
        }

        async fn send(&self, event: RoomEvent) {
            self.events.send(event).await.unwrap();
        }

        /// Lets the event pump run until `done` holds.
        async fn eventually(&self, done: impl Fn(&Self) -> bool) {
            for _ in 0..100 {
                if done(self) {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("condition not reached");
        }
    }

    fn issuer_once() -> Arc<dyn TokenIssuer> {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .withf(|room, identity| room == "room1" && identity == "alice")
            .times(1)
            .returning(|_, _| Ok(SecretString::from("token".to_string())));
        Arc::new(issuer)
    }

    fn harness_with(
        room: FakeRoom,
        config: SessionConfig,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Harness {
        let room = Arc::new(room);
        let (events, rx) = tokio::sync::mpsc::channel(32);
        let provider = Arc::new(FakeProvider {
            room: room.clone(),
            events: Mutex::new(Some(rx)),
            connects: AtomicUsize::new(0),
        });
        // Constant 0.0 makes `speaking` always map to talking.
        let mapper = StateMapper::new(
            SequenceRandom::constant(0.0),
            ToolCallDispatcher::detached(),
        )
        .shared();
        let client = SessionClient::new(config, provider.clone(), issuer, mapper);
        Harness {
            client,
            provider,
            room,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeRoom::default(),
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            issuer_once(),
        )
    }

    fn agent(state: &str) -> ParticipantInfo {
        ParticipantInfo::remote("agent-1", ParticipantKind::Agent)
            .with_attribute(AGENT_STATE_ATTRIBUTE, state)
    }

    fn agent_state_change(state: &str) -> RoomEvent {
        let participant = agent(state);
        RoomEvent::ParticipantAttributesChanged {
            changed: participant.attributes.clone(),
            participant,
        }
    }

    fn agent_audio(sid: &str) -> RoomEvent {
        RoomEvent::TrackSubscribed {
            track: RemoteTrack::audio(sid),
            participant: Some(agent("speaking")),
        }
    }

    #[tokio::test]
    async fn agent_listening_shows_listening() {
        let h = harness();
        let outcome = h.client.connect("room1", "alice").await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(h.client.status(), ConnectionStatus::Connected);
        assert!(!h.client.is_muted());

        h.send(RoomEvent::ParticipantConnected(agent("listening"))).await;
        h.eventually(|h| h.emotion() == EmotionState::Listening).await;
    }

    #[tokio::test]
    async fn agent_leaving_resets_face_and_releases_its_audio() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();

        h.send(agent_state_change("speaking")).await;
        h.send(agent_audio("TR_agent")).await;
        h.eventually(|h| h.client.active_sinks() == 1).await;
        assert_eq!(h.emotion(), EmotionState::Talking);
        let sink = h.room.sink("TR_agent");
        assert_eq!(sink.plays(), 1);

        h.send(RoomEvent::ParticipantDisconnected(agent("speaking"))).await;
        h.eventually(|h| h.emotion() == EmotionState::Neutral).await;
        assert_eq!(h.client.active_sinks(), 0);
        assert_eq!(sink.stops(), 1);
        assert_eq!(h.client.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn check_in_tool_call_keeps_emotion() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        h.send(agent_state_change("listening")).await;
        h.send(RoomEvent::DataReceived {
            payload: br#"{"type":"tool_call","tool":"check_in","timestamp":123,"name":"Sam"}"#
                .to_vec(),
            participant: Some(agent("listening")),
            topic: None,
        })
        .await;

        h.eventually(|h| {
            h.client.mapper().lock().unwrap().dispatcher().overlays().check_in.is_some()
        })
        .await;
        let mapper = h.client.mapper().lock().unwrap();
        let form = mapper.dispatcher().overlays().check_in.clone().unwrap();
        assert_eq!(form.name.as_deref(), Some("Sam"));
        assert_eq!(mapper.emotion(), EmotionState::Listening);
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_leaves_no_sinks() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();

        h.send(agent_audio("TR_1")).await;
        h.send(RoomEvent::TrackUnsubscribed {
            track: RemoteTrack::audio("TR_1"),
            participant: Some(agent("speaking")),
        })
        .await;
        h.eventually(|h| h.room.sinks.lock().unwrap().len() == 1 && h.client.active_sinks() == 0)
            .await;
        assert_eq!(h.room.sink("TR_1").stops(), 1);
    }

    #[tokio::test]
    async fn resubscribing_a_track_stops_the_old_sink_first() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();

        h.send(agent_audio("TR_1")).await;
        h.send(agent_audio("TR_1")).await;
        h.eventually(|h| h.room.sinks.lock().unwrap().len() == 2).await;
        h.eventually(|h| h.room.sinks.lock().unwrap()[1].1.plays() == 1).await;

        let sinks = h.room.sinks.lock().unwrap();
        let (old, new) = (&sinks[0].1, &sinks[1].1);
        assert_eq!(old.stops(), 1);
        assert!(new.is_playing());
        assert_eq!(h.room.overlapping.load(Ordering::SeqCst), 0);
        assert_eq!(h.client.active_sinks(), 1);
    }

    #[tokio::test]
    async fn tracks_without_sid_pair_up_by_identity() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        let anonymous = RemoteTrack {
            sid: None,
            kind: TrackKind::Audio,
        };

        h.send(RoomEvent::TrackSubscribed {
            track: anonymous.clone(),
            participant: Some(agent("speaking")),
        })
        .await;
        h.eventually(|h| h.client.active_sinks() == 1).await;

        h.send(RoomEvent::TrackUnsubscribed {
            track: anonymous,
            participant: Some(agent("speaking")),
        })
        .await;
        h.eventually(|h| h.client.active_sinks() == 0).await;
        assert_eq!(h.room.sink("agent-1-audio").stops(), 1);
    }

    #[tokio::test]
    async fn disconnect_twice_is_harmless() {
        let h = harness();
        h.client.disconnect().await;
        assert_eq!(h.client.active_sinks(), 0);

        h.client.connect("room1", "alice").await.unwrap();
        h.send(agent_audio("TR_1")).await;
        h.eventually(|h| h.client.active_sinks() == 1).await;

        h.client.disconnect().await;
        h.client.disconnect().await;
        assert_eq!(h.client.active_sinks(), 0);
        assert_eq!(h.client.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.room.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(h.room.sink("TR_1").stops(), 1);
    }

    #[tokio::test]
    async fn second_connect_is_a_no_op() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        let again = h.client.connect("room1", "alice").await.unwrap();
        assert_eq!(again, ConnectOutcome::AlreadyConnected);
        assert_eq!(h.provider.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_while_connecting_returns_early() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let h = harness_with(
            FakeRoom::default(),
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            Arc::new(GatedIssuer { gate: gate.clone() }),
        );

        let client = h.client.clone();
        let first = tokio::spawn(async move { client.connect("room1", "alice").await });
        h.eventually(|h| h.client.status() == ConnectionStatus::Connecting).await;

        let second = h.client.connect("room1", "alice").await.unwrap();
        assert_eq!(second, ConnectOutcome::AlreadyConnecting);

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), ConnectOutcome::Connected);
        assert_eq!(h.provider.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disconnect_during_connect_cancels_it() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let h = harness_with(
            FakeRoom::default(),
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            Arc::new(GatedIssuer { gate: gate.clone() }),
        );

        let client = h.client.clone();
        let attempt = tokio::spawn(async move { client.connect("room1", "alice").await });
        h.eventually(|h| h.client.status() == ConnectionStatus::Connecting).await;

        h.client.disconnect().await;
        gate.notify_one();

        let result = attempt.await.unwrap();
        assert!(matches!(result, Err(SessionError::Cancelled)));
        assert_eq!(h.client.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.room.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.last_error(), None);
    }

    #[tokio::test]
    async fn denied_microphone_still_connects() {
        let room = FakeRoom {
            mic_denied: true,
            ..FakeRoom::default()
        };
        let h = harness_with(
            room,
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            issuer_once(),
        );

        assert_eq!(
            h.client.connect("room1", "alice").await.unwrap(),
            ConnectOutcome::Connected
        );
        assert!(h.client.is_connected());
        assert!(h.client.is_muted());
        assert_eq!(h.client.last_error(), None);
    }

    #[tokio::test]
    async fn missing_url_fails_before_issuing_a_token() {
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_issue().times(0);
        let h = harness_with(FakeRoom::default(), SessionConfig::default(), Arc::new(issuer));

        let err = h.client.connect("room1", "alice").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingUrl));
        assert_eq!(h.client.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.client.last_error().as_deref(), Some("LIVEKIT_URL is not set"));
        assert_eq!(h.provider.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_failure_leaves_nothing_half_open() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_issue()
            .times(1)
            .returning(|_, _| Err(TokenError::MissingCredentials));
        let h = harness_with(
            FakeRoom::default(),
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            Arc::new(issuer),
        );

        let err = h.client.connect("room1", "alice").await.unwrap_err();
        assert!(matches!(err, SessionError::Token(TokenError::MissingCredentials)));
        assert_eq!(h.client.status(), ConnectionStatus::Disconnected);
        assert!(h.client.last_error().is_some());
        assert_eq!(h.provider.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconnecting_keeps_sinks_and_mute_state() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        h.client.toggle_mute().await;
        assert!(h.client.is_muted());

        h.send(agent_audio("TR_1")).await;
        h.send(RoomEvent::Reconnecting).await;
        h.eventually(|h| h.client.status() == ConnectionStatus::Reconnecting).await;
        assert_eq!(h.client.active_sinks(), 1);
        assert!(h.client.is_muted());

        h.send(RoomEvent::Reconnected).await;
        h.eventually(|h| h.client.status() == ConnectionStatus::Connected).await;
        assert_eq!(h.client.active_sinks(), 1);

        h.send(agent_state_change("listening")).await;
        h.send(RoomEvent::Disconnected {
            reason: Some("server shutdown".to_string()),
        })
        .await;
        h.eventually(|h| h.client.status() == ConnectionStatus::Disconnected).await;
        assert_eq!(h.client.active_sinks(), 0);
        assert_eq!(h.emotion(), EmotionState::Neutral);
        assert_eq!(h.room.sink("TR_1").stops(), 1);
    }

    #[tokio::test]
    async fn data_from_nobody_or_ourselves_is_ignored() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        h.send(RoomEvent::DataReceived {
            payload: br#"{"type":"emotion_update","emotion":"SAD"}"#.to_vec(),
            participant: Some(agent("listening")),
            topic: Some("emotion".to_string()),
        })
        .await;
        h.eventually(|h| h.emotion() == EmotionState::Sad).await;

        let happy = br#"{"type":"emotion_update","emotion":"HAPPY"}"#.to_vec();
        let mut me = ParticipantInfo::remote("alice", ParticipantKind::Standard);
        me.is_local = true;
        h.send(RoomEvent::DataReceived {
            payload: happy.clone(),
            participant: None,
            topic: None,
        })
        .await;
        h.send(RoomEvent::DataReceived {
            payload: happy,
            participant: Some(me),
            topic: None,
        })
        .await;
        // Events are handled in order: once this sink exists, both messages
        // above have been seen.
        h.send(agent_audio("TR_marker")).await;
        h.eventually(|h| h.client.active_sinks() == 1).await;
        assert_eq!(h.emotion(), EmotionState::Sad);
    }

    #[tokio::test]
    async fn agent_already_in_room_is_picked_up_on_connect() {
        let room = FakeRoom::default();
        room.participants.lock().unwrap().extend([
            ParticipantInfo::remote("bob", ParticipantKind::Standard),
            agent("thinking"),
        ]);
        let h = harness_with(
            room,
            SessionConfig::builder().with_url("wss://rooms.test").build(),
            issuer_once(),
        );

        h.client.connect("room1", "alice").await.unwrap();
        assert_eq!(h.emotion(), EmotionState::Thinking);
    }

    #[tokio::test]
    async fn unrelated_attribute_changes_are_ignored() {
        let h = harness();
        h.client.connect("room1", "alice").await.unwrap();
        h.send(agent_state_change("listening")).await;
        h.eventually(|h| h.emotion() == EmotionState::Listening).await;

        h.send(RoomEvent::ParticipantAttributesChanged {
            changed: [("mood".to_string(), "grumpy".to_string())].into(),
            participant: agent("thinking"),
        })
        .await;
        h.send(RoomEvent::DataReceived {
            payload: b"{broken".to_vec(),
            participant: Some(agent("listening")),
            topic: None,
        })
        .await;
        h.send(RoomEvent::ActiveSpeakersChanged(vec!["agent-1".to_string()]))
            .await;
        h.send(agent_audio("TR_marker")).await;
        h.eventually(|h| h.client.active_sinks() == 1).await;
        assert_eq!(h.emotion(), EmotionState::Listening);
    }

    #[tokio::test]
    async fn toggle_mute_needs_a_session() {
        let h = harness();
        h.client.toggle_mute().await;
        assert!(!h.client.is_muted());

        h.client.connect("room1", "alice").await.unwrap();
        h.client.toggle_mute().await;
        assert!(h.client.is_muted());
        assert!(!h.room.is_microphone_enabled());
        h.client.toggle_mute().await;
        assert!(!h.client.is_muted());
    }
}
