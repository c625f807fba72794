pub const DEFAULT_ROOM: &str = "rummi-room";
pub const DEFAULT_IDENTITY: &str = "user";

/// Characters of the user id kept in the room name.
const ROOM_ID_PREFIX_LEN: usize = 8;

/// The authenticated user, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Per-user room so two users never share an agent session.
    pub fn room_name(&self) -> String {
        let prefix: String = self.id.chars().take(ROOM_ID_PREFIX_LEN).collect();
        if prefix.is_empty() {
            return DEFAULT_ROOM.to_string();
        }
        format!("{DEFAULT_ROOM}-{prefix}")
    }

    /// Email local part, or the user id when there is no usable email.
    pub fn participant_identity(&self) -> String {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Room and participant identity to connect with.
pub fn room_and_identity(user: Option<&UserIdentity>) -> (String, String) {
    match user {
        Some(user) => (user.room_name(), user.participant_identity()),
        None => (DEFAULT_ROOM.to_string(), DEFAULT_IDENTITY.to_string()),
    }
}
