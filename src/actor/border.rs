//! Focus border trigger. Deciding when the border is visible lives here;
//! drawing it is up to whoever holds the receiving end.

use tracing::{debug, trace};

use crate::actor;
use crate::sys::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BorderRequest {
    Show(Rect),
    Hide,
}

pub type Sender = actor::Sender<BorderRequest>;
pub type Receiver = actor::Receiver<BorderRequest>;

/// Forwards border state to the renderer, dropping repeats.
#[derive(Debug)]
pub struct BorderTrigger {
    tx: Option<Sender>,
    last: Option<BorderRequest>,
}

impl BorderTrigger {
    pub fn new(tx: Option<Sender>) -> Self { Self { tx, last: None } }

    /// `frame` is the focused tiled window's frame, if there is one.
    pub fn update(&mut self, frame: Option<Rect>) {
        let request = match frame {
            Some(frame) => BorderRequest::Show(frame),
            None => BorderRequest::Hide,
        };
        if self.last == Some(request) {
            return;
        }
        self.last = Some(request);
        trace!(?request, "Border changed");
        if let Some(tx) = &self.tx {
            tx.send(request);
        }
    }

    pub fn hide(&mut self) { self.update(None) }
}

/// Renderer stand-in for builds without an overlay: records what would be
/// drawn.
pub async fn log_requests(mut rx: Receiver) {
    while let Some((span, request)) = rx.recv().await {
        let _guard = span.enter();
        debug!(?request, "Border");
    }
}
