//! Live view: the latest-frame slot and per-viewer MJPEG streams.

mod slot;
mod stream;

pub use slot::LiveFrameSlot;
pub use stream::{multipart_chunk, viewer_stream, BOUNDARY, CONTENT_TYPE};
