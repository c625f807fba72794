use crate::generic_types::{ParticipantInfo, RemoteTrack, RoomEvent};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A realtime room service: audio transport, participants and a data channel.
/// The session client only ever talks to the provider through this trait, so
/// any SDK or bridge can sit behind it.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Opens a session with an already-issued access token.
    async fn connect(&self, url: &str, token: &str) -> Result<RoomConnection>;
}

/// A live room plus the stream of events it emits, in provider order.
pub struct RoomConnection {
    pub room: Arc<dyn Room>,
    pub events: tokio::sync::mpsc::Receiver<RoomEvent>,
}

#[async_trait]
pub trait Room: Send + Sync {
    /// Leaves the room. Dropping the event receiver afterwards is expected.
    async fn disconnect(&self);

    /// Publishes or unpublishes the local microphone. Errors mean the device
    /// could not be acquired.
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<()>;

    fn is_microphone_enabled(&self) -> bool;

    /// Remote participants currently in the room.
    fn remote_participants(&self) -> Vec<ParticipantInfo>;

    /// Binds a subscribed remote audio track to a local playback endpoint.
    fn attach_audio(
        &self,
        track: &RemoteTrack,
        participant: &ParticipantInfo,
    ) -> Result<Box<dyn AudioSink>>;
}

/// A local playback endpoint bound to one remote track.
pub trait AudioSink: Send {
    fn play(&mut self) -> Result<()>;

    /// Stops playback and detaches the media. Must be safe to call twice.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}
