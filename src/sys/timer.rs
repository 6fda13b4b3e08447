use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{Instrument, Span};

use crate::actor;

/// Arranges for an event to be delivered to an actor after a delay.
///
/// Deliveries are fire-and-forget; there is no way to cancel one.
pub trait Timer<Event> {
    fn send_after(&self, delay: Duration, event: Event);
}

/// Production timer: a task on the actor's runtime sleeps, then sends.
pub struct TokioTimer<Event> {
    handle: Handle,
    tx: actor::Sender<Event>,
}

impl<Event> TokioTimer<Event> {
    pub fn new(handle: Handle, tx: actor::Sender<Event>) -> Self { Self { handle, tx } }
}

impl<Event: Send + 'static> Timer<Event> for TokioTimer<Event> {
    fn send_after(&self, delay: Duration, event: Event) {
        let tx = self.tx.clone();
        self.handle.spawn(
            async move {
                tokio::time::sleep(delay).await;
                tx.send(event);
            }
            .instrument(Span::current()),
        );
    }
}
