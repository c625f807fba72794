use std::collections::HashMap;

// Outgoing messages
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// Join a room. Acknowledged with a [`RoomSnapshot`].
    Join { id: u64, url: String, token: String },
    SetMicrophone { id: u64, enabled: bool },
    /// Start playback of a subscribed remote track.
    Play { track: String },
    Stop { track: String },
    Disconnect,
}

impl BridgeCommand {
    /// Request id for commands that expect an acknowledgement.
    pub fn id(&self) -> Option<u64> {
        match self {
            BridgeCommand::Join { id, .. } | BridgeCommand::SetMicrophone { id, .. } => Some(*id),
            _ => None,
        }
    }
}

// Incoming messages
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    Ack {
        id: u64,
        #[serde(default = "default_true")]
        ok: bool,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        data: serde_json::Value,
    },
    Connected,
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
    Reconnecting,
    Reconnected,
    ParticipantConnected {
        participant: WireParticipant,
    },
    ParticipantDisconnected {
        participant: WireParticipant,
    },
    ParticipantAttributesChanged {
        changed: HashMap<String, String>,
        participant: WireParticipant,
    },
    TrackSubscribed {
        track: WireTrack,
        #[serde(default)]
        participant: Option<WireParticipant>,
    },
    TrackUnsubscribed {
        track: WireTrack,
        #[serde(default)]
        participant: Option<WireParticipant>,
    },
    /// `payload` is the data packet decoded as UTF-8 text.
    DataReceived {
        payload: String,
        #[serde(default)]
        participant: Option<WireParticipant>,
        #[serde(default)]
        topic: Option<String>,
    },
    ActiveSpeakersChanged {
        speakers: Vec<String>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WireParticipantKind {
    #[default]
    Standard,
    Agent,
    Ingress,
    Egress,
    Sip,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct WireParticipant {
    pub identity: String,
    #[serde(default)]
    pub kind: WireParticipantKind,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireTrackKind {
    Audio,
    Video,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct WireTrack {
    #[serde(default)]
    pub sid: Option<String>,
    pub kind: WireTrackKind,
}

/// Payload of the `join` acknowledgement.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Default)]
pub struct RoomSnapshot {
    #[serde(default)]
    pub participants: Vec<WireParticipant>,
    #[serde(default)]
    pub microphone_enabled: bool,
}
