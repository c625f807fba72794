use crate::UiCommand;
use pixelface_types::{ToolCallEvent, ToolName};
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Map,
    CheckIn,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "overlay", rename_all = "snake_case")]
pub enum Overlay {
    Map,
    CheckIn(CheckInForm),
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::Map => OverlayKind::Map,
            Overlay::CheckIn(_) => OverlayKind::CheckIn,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CheckInForm {
    /// Name suggested by the agent; the form starts out with it filled in
    pub name: Option<String>,
}

/// Which overlays are currently open.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct OverlayState {
    pub map_open: bool,
    pub check_in: Option<CheckInForm>,
}

/// Routes decoded tool calls to exactly one UI side effect each.
pub struct ToolCallDispatcher {
    overlays: OverlayState,
    ui_tx: Option<tokio::sync::mpsc::Sender<UiCommand>>,
}

impl ToolCallDispatcher {
    pub fn new(ui_tx: tokio::sync::mpsc::Sender<UiCommand>) -> Self {
        Self {
            overlays: OverlayState::default(),
            ui_tx: Some(ui_tx),
        }
    }

    /// A dispatcher that only tracks overlay state.
    pub fn detached() -> Self {
        Self {
            overlays: OverlayState::default(),
            ui_tx: None,
        }
    }

    pub fn overlays(&self) -> &OverlayState {
        &self.overlays
    }

    /// Opens the overlay `event` asks for. Unknown tools are logged and ignored.
    pub fn dispatch(&mut self, event: &ToolCallEvent) -> Option<Overlay> {
        let overlay = match event.tool() {
            ToolName::ShowMap => {
                self.overlays.map_open = true;
                Overlay::Map
            }
            ToolName::CheckIn => {
                let form = CheckInForm {
                    name: event.name().map(str::to_string),
                };
                self.overlays.check_in = Some(form.clone());
                Overlay::CheckIn(form)
            }
            ToolName::Other(name) => {
                tracing::warn!("ignoring unknown tool call: {}", name);
                return None;
            }
        };
        tracing::info!("tool call opened overlay: {:?}", overlay);
        self.send(UiCommand::Open(overlay.clone()));
        Some(overlay)
    }

    /// Closes one overlay. Returns false if it was not open.
    pub fn dismiss(&mut self, kind: OverlayKind) -> bool {
        let was_open = match kind {
            OverlayKind::Map => std::mem::replace(&mut self.overlays.map_open, false),
            OverlayKind::CheckIn => self.overlays.check_in.take().is_some(),
        };
        if was_open {
            self.send(UiCommand::Close(kind));
        }
        was_open
    }

    fn send(&self, command: UiCommand) {
        let Some(tx) = &self.ui_tx else {
            return;
        };
        match tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                tracing::warn!("ui command channel full, dropping {:?}", command);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("ui command receiver dropped");
            }
        }
    }
}
