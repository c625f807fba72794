use std::collections::HashMap;

/// What kind of participant the provider says a remote peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    Standard,
    Agent,
    Ingress,
    Egress,
    Sip,
}

/// Snapshot of a participant as reported with an event.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantInfo {
    pub identity: String,
    pub kind: ParticipantKind,
    pub is_local: bool,
    pub attributes: HashMap<String, String>,
}

impl ParticipantInfo {
    pub fn remote(identity: &str, kind: ParticipantKind) -> Self {
        Self {
            identity: identity.to_string(),
            kind,
            is_local: false,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_agent(&self) -> bool {
        self.kind == ParticipantKind::Agent
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    /// Provider-assigned track id; may be missing on some transports
    pub sid: Option<String>,
    pub kind: TrackKind,
}

impl RemoteTrack {
    pub fn audio(sid: &str) -> Self {
        Self {
            sid: Some(sid.to_string()),
            kind: TrackKind::Audio,
        }
    }

    /// Key the playback sink for this track is registered under. Falls back to
    /// the owner's identity so subscribe and unsubscribe always agree.
    pub fn sink_key(&self, participant: Option<&ParticipantInfo>) -> String {
        match &self.sid {
            Some(sid) if !sid.is_empty() => sid.clone(),
            _ => format!(
                "{}-audio",
                participant.map(|p| p.identity.as_str()).unwrap_or("unknown")
            ),
        }
    }
}

/// Generic events any room provider can emit back to the session client.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Connected,
    Disconnected {
        reason: Option<String>,
    },
    Reconnecting,
    Reconnected,
    ParticipantConnected(ParticipantInfo),
    ParticipantDisconnected(ParticipantInfo),
    ParticipantAttributesChanged {
        changed: HashMap<String, String>,
        participant: ParticipantInfo,
    },
    TrackSubscribed {
        track: RemoteTrack,
        participant: Option<ParticipantInfo>,
    },
    TrackUnsubscribed {
        track: RemoteTrack,
        participant: Option<ParticipantInfo>,
    },
    DataReceived {
        payload: Vec<u8>,
        participant: Option<ParticipantInfo>,
        topic: Option<String>,
    },
    ActiveSpeakersChanged(Vec<String>),
}
