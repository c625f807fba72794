pub mod demo;
pub mod dispatcher;
pub mod generic_types;
pub mod mapper;
pub mod room_api;

pub use dispatcher::{CheckInForm, Overlay, OverlayKind, OverlayState, ToolCallDispatcher};
pub use mapper::{SharedMapper, StateMapper};

/// Side effects the core asks the UI layer to perform.
///
/// The dispatcher only decides *which* overlay to show; drawing it is up to
/// whoever holds the receiving end of the channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "command", content = "target", rename_all = "snake_case")]
pub enum UiCommand {
    /// Show an overlay on top of the face.
    Open(Overlay),
    /// Hide an overlay. The session is unaffected.
    Close(OverlayKind),
}
