use crate::ws::ClientMessage;

/// Outbound half of the message channel the sync core talks through.
///
/// Sends are fire-and-forget: the core never waits on a reply. Returns
/// `false` when the message could not be queued (transport gone or full).
pub trait SyncChannel {
    fn send(&mut self, message: ClientMessage) -> bool;
}

impl SyncChannel for Vec<ClientMessage> {
    fn send(&mut self, message: ClientMessage) -> bool {
        self.push(message);
        true
    }
}

#[cfg(feature = "client")]
impl SyncChannel for async_channel::Sender<ClientMessage> {
    fn send(&mut self, message: ClientMessage) -> bool {
        let name = message.type_name();
        match self.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dropping outbound {}: {}", name, e);
                false
            }
        }
    }
}
