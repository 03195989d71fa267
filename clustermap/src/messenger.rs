use maybe_sync::{MaybeSend, MaybeSync};

/// Wakes up the thread owning the map overlay.
///
/// The compute context calls [`Messenger::request_redraw`] every time it posts a result for the
/// [`ClusterOverlay`](crate::ClusterOverlay). The host is expected to call
/// [`ClusterOverlay::process_messages`](crate::ClusterOverlay::process_messages) on its UI thread
/// soon after that, usually as part of the next frame.
pub trait Messenger: MaybeSend + MaybeSync {
    /// Requests a redraw of the map.
    fn request_redraw(&self);
}

/// Messenger that does nothing. Use it when the host polls the overlay every frame anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
