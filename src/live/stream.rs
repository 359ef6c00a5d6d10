//! Per-viewer motion-JPEG stream.
//!
//! Each viewer gets its own stream over the shared [`LiveFrameSlot`]. The
//! stream emits the current frame (if any) as soon as it starts, then
//! suspends until the slot changes. An empty slot produces no output.
//! The stream ends when the slot is closed; a client disconnect drops it.

use super::slot::LiveFrameSlot;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Multipart boundary between frames.
pub const BOUNDARY: &str = "frame";

/// `Content-Type` of a viewer stream response.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Wraps one JPEG in a multipart chunk.
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    const HEAD: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    let mut chunk = BytesMut::with_capacity(HEAD.len() + jpeg.len() + 2);
    chunk.put_slice(HEAD);
    chunk.put_slice(jpeg);
    chunk.put_slice(b"\r\n");
    chunk.freeze()
}

struct Viewer<G> {
    frames: watch::Receiver<Option<Bytes>>,
    closed: CancellationToken,
    started: bool,
    // Held for the stream's lifetime; dropped on disconnect.
    _guard: G,
}

impl<G> Viewer<G> {
    async fn next_frame(&mut self) -> Option<Bytes> {
        if !self.started {
            self.started = true;
            let current = self.frames.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }

        loop {
            tokio::select! {
                _ = self.closed.cancelled() => return None,
                changed = self.frames.changed() => {
                    changed.ok()?;
                    let current = self.frames.borrow_and_update().clone();
                    if current.is_some() {
                        return current;
                    }
                }
            }
        }
    }
}

/// Creates a viewer stream over `slot`.
///
/// `guard` lives exactly as long as the stream, which makes it a hook
/// for connection accounting.
pub fn viewer_stream<G>(
    slot: &LiveFrameSlot,
    guard: G,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    G: Send + 'static,
{
    let viewer = Viewer {
        frames: slot.subscribe(),
        closed: slot.closed(),
        started: false,
        _guard: guard,
    };

    stream::unfold(viewer, |mut viewer| async move {
        if viewer.closed.is_cancelled() {
            return None;
        }
        let frame = viewer.next_frame().await?;
        Some((Ok(multipart_chunk(&frame)), viewer))
    })
}
