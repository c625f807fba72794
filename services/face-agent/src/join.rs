use pixelface_session::{ConnectOutcome, SessionClient};

/// Joins `room` and reports the outcome. Failures are already logged by the
/// client and kept in `last_error`, so they are not logged again here.
pub async fn join_room(
    client: &SessionClient,
    room: &str,
    identity: &str,
) -> Option<ConnectOutcome> {
    match client.connect(room, identity).await {
        Ok(outcome) => {
            tracing::info!("connect: {:?} ({} as {})", outcome, room, identity);
            Some(outcome)
        }
        Err(_) => None,
    }
}
