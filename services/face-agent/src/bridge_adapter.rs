use anyhow::{Context, Result};
use async_trait::async_trait;
use pixelface_core::generic_types::{
    ParticipantInfo, ParticipantKind, RemoteTrack, RoomEvent, TrackKind,
};
use pixelface_core::room_api::{AudioSink, Room, RoomConnection, RoomProvider};
use pixelface_room_bridge::BridgeClient;
use pixelface_room_bridge::types::{
    BridgeCommand, BridgeEvent, RoomSnapshot, WireParticipant, WireParticipantKind, WireTrack,
    WireTrackKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An adapter that implements the generic `RoomProvider` trait on top of a
/// WebSocket room bridge.
pub struct BridgeProvider {
    bridge_url: String,
    capacity: usize,
}

impl BridgeProvider {
    pub fn new(bridge_url: &str, capacity: usize) -> Self {
        Self {
            bridge_url: bridge_url.to_string(),
            capacity,
        }
    }
}

#[async_trait]
impl RoomProvider for BridgeProvider {
    async fn connect(&self, url: &str, token: &str) -> Result<RoomConnection> {
        let (client, mut bridge_rx) =
            pixelface_room_bridge::connect(&self.bridge_url, self.capacity)
                .await
                .context("Failed to reach room bridge")?;

        let join = BridgeCommand::Join {
            id: client.next_id(),
            url: url.to_string(),
            token: token.to_string(),
        };
        let data = client
            .request("join", join)
            .await
            .context("Room bridge failed to join")?;
        let snapshot: RoomSnapshot = if data.is_null() {
            RoomSnapshot::default()
        } else {
            serde_json::from_value(data).context("Malformed join acknowledgement")?
        };
        tracing::info!(
            "joined room via bridge ({} participants present)",
            snapshot.participants.len()
        );

        let room = Arc::new(BridgeRoom::new(client, snapshot));
        let (tx, rx) = tokio::sync::mpsc::channel(self.capacity);

        let roster = room.clone();
        tokio::spawn(async move {
            while let Some(event) = bridge_rx.recv().await {
                roster.observe(&event);
                let Some(event) = translate(event) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    tracing::debug!("room event receiver dropped");
                    return;
                }
            }
            // Socket gone without a goodbye.
            let _ = tx
                .send(RoomEvent::Disconnected {
                    reason: Some("bridge connection closed".to_string()),
                })
                .await;
        });

        Ok(RoomConnection { room, events: rx })
    }
}

/// A room joined through the bridge. Keeps its own participant roster so
/// `remote_participants` can answer without a round trip.
pub struct BridgeRoom {
    client: BridgeClient,
    participants: Mutex<HashMap<String, ParticipantInfo>>,
    microphone: AtomicBool,
}

impl BridgeRoom {
    fn new(client: BridgeClient, snapshot: RoomSnapshot) -> Self {
        let participants = snapshot
            .participants
            .into_iter()
            .map(|p| (p.identity.clone(), participant(p)))
            .collect();
        Self {
            client,
            participants: Mutex::new(participants),
            microphone: AtomicBool::new(snapshot.microphone_enabled),
        }
    }

    fn roster(&self) -> std::sync::MutexGuard<'_, HashMap<String, ParticipantInfo>> {
        self.participants.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, event: &BridgeEvent) {
        match event {
            BridgeEvent::ParticipantConnected { participant: p }
            | BridgeEvent::ParticipantAttributesChanged { participant: p, .. } => {
                self.roster().insert(p.identity.clone(), participant(p.clone()));
            }
            BridgeEvent::ParticipantDisconnected { participant: p } => {
                self.roster().remove(&p.identity);
            }
            BridgeEvent::Disconnected { .. } => self.roster().clear(),
            _ => {}
        }
    }
}

#[async_trait]
impl Room for BridgeRoom {
    async fn disconnect(&self) {
        if let Err(e) = self.client.send(BridgeCommand::Disconnect).await {
            tracing::debug!("bridge already gone on disconnect: {}", e);
        }
        self.roster().clear();
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<()> {
        let command = BridgeCommand::SetMicrophone {
            id: self.client.next_id(),
            enabled,
        };
        self.client.request("set_microphone", command).await?;
        self.microphone.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_microphone_enabled(&self) -> bool {
        self.microphone.load(Ordering::SeqCst)
    }

    fn remote_participants(&self) -> Vec<ParticipantInfo> {
        self.roster().values().filter(|p| !p.is_local).cloned().collect()
    }

    fn attach_audio(
        &self,
        track: &RemoteTrack,
        participant: &ParticipantInfo,
    ) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(BridgeSink {
            client: self.client.clone(),
            track: track.sink_key(Some(participant)),
            playing: false,
        }))
    }
}

/// Playback of one remote track, performed by the bridge.
pub struct BridgeSink {
    client: BridgeClient,
    track: String,
    playing: bool,
}

impl AudioSink for BridgeSink {
    fn play(&mut self) -> Result<()> {
        self.client
            .try_send(BridgeCommand::Play {
                track: self.track.clone(),
            })
            .with_context(|| format!("Failed to start playback of {}", self.track))?;
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        if let Err(e) = self.client.try_send(BridgeCommand::Stop {
            track: self.track.clone(),
        }) {
            tracing::warn!("failed to stop playback of {}: {}", self.track, e);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

fn participant(wire: WireParticipant) -> ParticipantInfo {
    let kind = match wire.kind {
        WireParticipantKind::Standard => ParticipantKind::Standard,
        WireParticipantKind::Agent => ParticipantKind::Agent,
        WireParticipantKind::Ingress => ParticipantKind::Ingress,
        WireParticipantKind::Egress => ParticipantKind::Egress,
        WireParticipantKind::Sip => ParticipantKind::Sip,
    };
    ParticipantInfo {
        identity: wire.identity,
        kind,
        is_local: wire.is_local,
        attributes: wire.attributes,
    }
}

fn track(wire: WireTrack) -> RemoteTrack {
    RemoteTrack {
        sid: wire.sid,
        kind: match wire.kind {
            WireTrackKind::Audio => TrackKind::Audio,
            WireTrackKind::Video => TrackKind::Video,
        },
    }
}

/// Maps a bridge frame onto the generic event stream. Acks never reach here.
fn translate(event: BridgeEvent) -> Option<RoomEvent> {
    let event = match event {
        BridgeEvent::Ack { id, .. } => {
            tracing::warn!("stray ack {} on the event stream", id);
            return None;
        }
        BridgeEvent::Connected => RoomEvent::Connected,
        BridgeEvent::Disconnected { reason } => RoomEvent::Disconnected { reason },
        BridgeEvent::Reconnecting => RoomEvent::Reconnecting,
        BridgeEvent::Reconnected => RoomEvent::Reconnected,
        BridgeEvent::ParticipantConnected { participant: p } => {
            RoomEvent::ParticipantConnected(participant(p))
        }
        BridgeEvent::ParticipantDisconnected { participant: p } => {
            RoomEvent::ParticipantDisconnected(participant(p))
        }
        BridgeEvent::ParticipantAttributesChanged { changed, participant: p } => {
            RoomEvent::ParticipantAttributesChanged {
                changed,
                participant: participant(p),
            }
        }
        BridgeEvent::TrackSubscribed {
            track: t,
            participant: p,
        } => RoomEvent::TrackSubscribed {
            track: track(t),
            participant: p.map(participant),
        },
        BridgeEvent::TrackUnsubscribed {
            track: t,
            participant: p,
        } => RoomEvent::TrackUnsubscribed {
            track: track(t),
            participant: p.map(participant),
        },
        BridgeEvent::DataReceived {
            payload,
            participant: p,
            topic,
        } => RoomEvent::DataReceived {
            payload: payload.into_bytes(),
            participant: p.map(participant),
            topic,
        },
        BridgeEvent::ActiveSpeakersChanged { speakers } => {
            RoomEvent::ActiveSpeakersChanged(speakers)
        }
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use pixelface_types::AGENT_STATE_ATTRIBUTE;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::protocol::Message;

    fn wire_agent(state: &str) -> WireParticipant {
        WireParticipant {
            identity: "agent-1".to_string(),
            kind: WireParticipantKind::Agent,
            is_local: false,
            attributes: HashMap::from([(AGENT_STATE_ATTRIBUTE.to_string(), state.to_string())]),
        }
    }

    /// Bridge that acknowledges everything, sends `after_join` once joined,
    /// then closes the socket when told to disconnect.
    async fn fake_bridge(
        after_join: Vec<serde_json::Value>,
    ) -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let command: serde_json::Value = serde_json::from_str(&text).unwrap();
                match command["command"].as_str() {
                    Some("join") => {
                        let ack = serde_json::json!({
                            "event": "ack",
                            "id": command["id"],
                            "data": {
                                "participants": [
                                    {"identity": "agent-1", "kind": "agent",
                                     "attributes": {"lk.agent.state": "listening"}},
                                    {"identity": "me", "is_local": true}
                                ],
                                "microphone_enabled": false
                            }
                        });
                        ws.send(Message::Text(ack.to_string())).await.unwrap();
                        for frame in &after_join {
                            ws.send(Message::Text(frame.to_string())).await.unwrap();
                        }
                    }
                    Some("set_microphone") => {
                        let ack = serde_json::json!({"event": "ack", "id": command["id"]});
                        ws.send(Message::Text(ack.to_string())).await.unwrap();
                    }
                    Some("disconnect") => {
                        let _ = seen_tx.send(command);
                        let _ = ws.close(None).await;
                        return;
                    }
                    _ => {}
                }
                let _ = seen_tx.send(command);
            }
        });
        (url, seen_rx)
    }

    #[test]
    fn data_payload_becomes_bytes() {
        let event = translate(BridgeEvent::DataReceived {
            payload: r#"{"type":"emotion_update","emotion":"SAD"}"#.to_string(),
            participant: Some(wire_agent("speaking")),
            topic: None,
        })
        .unwrap();
        let RoomEvent::DataReceived { payload, participant, .. } = event else {
            panic!("wrong variant: {event:?}");
        };
        assert_eq!(payload, br#"{"type":"emotion_update","emotion":"SAD"}"#.to_vec());
        assert!(participant.unwrap().is_agent());
    }

    #[test]
    fn tracks_and_participants_convert() {
        let event = translate(BridgeEvent::TrackSubscribed {
            track: WireTrack {
                sid: None,
                kind: WireTrackKind::Audio,
            },
            participant: Some(wire_agent("idle")),
        })
        .unwrap();
        let RoomEvent::TrackSubscribed { track, participant } = event else {
            panic!("wrong variant: {event:?}");
        };
        assert_eq!(track.kind, TrackKind::Audio);
        assert_eq!(track.sink_key(participant.as_ref()), "agent-1-audio");
        assert_eq!(participant.unwrap().attribute(AGENT_STATE_ATTRIBUTE), Some("idle"));

        assert!(
            translate(BridgeEvent::Ack {
                id: 3,
                ok: true,
                error: None,
                data: serde_json::Value::Null,
            })
            .is_none()
        );
    }

    #[tokio::test]
    async fn join_seeds_roster_and_events_are_translated() {
        let (url, mut seen) = fake_bridge(vec![
            serde_json::json!({"event": "connected"}),
            serde_json::json!({
                "event": "participant_attributes_changed",
                "changed": {"lk.agent.state": "speaking"},
                "participant": {"identity": "agent-1", "kind": "agent",
                                "attributes": {"lk.agent.state": "speaking"}}
            }),
            serde_json::json!({
                "event": "participant_disconnected",
                "participant": {"identity": "agent-1", "kind": "agent"}
            }),
        ])
        .await;
        let provider = BridgeProvider::new(&url, 16);
        let RoomConnection { room, mut events } =
            provider.connect("wss://rooms", "jwt").await.unwrap();

        let join = seen.recv().await.unwrap();
        assert_eq!(join["url"], "wss://rooms");
        assert_eq!(join["token"], "jwt");

        let remote = room.remote_participants();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].attribute(AGENT_STATE_ATTRIBUTE), Some("listening"));
        assert!(!room.is_microphone_enabled());

        assert_eq!(events.recv().await.unwrap(), RoomEvent::Connected);
        let Some(RoomEvent::ParticipantAttributesChanged { changed, .. }) = events.recv().await
        else {
            panic!("expected attribute change");
        };
        assert_eq!(changed[AGENT_STATE_ATTRIBUTE], "speaking");
        assert!(matches!(
            events.recv().await,
            Some(RoomEvent::ParticipantDisconnected(p)) if p.identity == "agent-1"
        ));
        assert!(room.remote_participants().is_empty());
    }

    #[tokio::test]
    async fn microphone_and_playback_go_through_the_bridge() {
        let (url, mut seen) = fake_bridge(Vec::new()).await;
        let provider = BridgeProvider::new(&url, 16);
        let RoomConnection { room, mut events } =
            provider.connect("wss://rooms", "jwt").await.unwrap();
        seen.recv().await.unwrap();

        room.set_microphone_enabled(true).await.unwrap();
        assert!(room.is_microphone_enabled());
        assert_eq!(seen.recv().await.unwrap()["enabled"], true);

        let agent = participant(wire_agent("speaking"));
        let mut sink = room.attach_audio(&RemoteTrack::audio("TR_9"), &agent).unwrap();
        sink.play().unwrap();
        assert!(sink.is_playing());
        sink.stop();
        sink.stop();
        assert!(!sink.is_playing());

        assert_eq!(
            seen.recv().await.unwrap(),
            serde_json::json!({"command": "play", "track": "TR_9"})
        );
        assert_eq!(
            seen.recv().await.unwrap(),
            serde_json::json!({"command": "stop", "track": "TR_9"})
        );

        // The bridge hangs up after a disconnect; the stream reports it.
        room.disconnect().await;
        assert_eq!(seen.recv().await.unwrap()["command"], "disconnect");
        assert!(matches!(
            events.recv().await,
            Some(RoomEvent::Disconnected { reason: Some(_) })
        ));
    }
}
