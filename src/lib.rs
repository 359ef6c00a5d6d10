//! Frame Relay Library
//!
//! Receives still frames from a camera over HTTP, stamps each with the
//! time it arrived, broadcasts the newest one to live viewers as a
//! multipart JPEG stream and keeps a bounded, browsable archive.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! POST /upload → ingest → codec → live slot → GET /video_feed
//!                              ↘ archive  → history → GET /pre_recordings
//! ```
//!
//! # Design Principles
//!
//! - **Newest wins**: the live slot holds one frame; slow viewers skip
//!   intermediate frames instead of queueing them
//! - **Bounded storage**: every archive insert evicts the oldest records
//!   first so the archive stays near its capacity
//! - **One clock reading per frame**: the watermark and the stored
//!   timestamp come from the same instant
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::{
//!     archive::{ArchiveConfig, BoundedArchive, MemoryFrameStore},
//!     codec::FrameCodec,
//!     history::{HistoryFilter, HistoryService},
//!     ingest::IngestPipeline,
//!     live::LiveFrameSlot,
//!     metrics::MetricsRegistry,
//! };
//! use std::sync::Arc;
//!
//! # async fn run(raw: bytes::Bytes) -> Result<(), Box<dyn std::error::Error>> {
//! let timezone = chrono_tz::Asia::Kolkata;
//! let store = Arc::new(MemoryFrameStore::new());
//! let archive = Arc::new(BoundedArchive::new(store, &ArchiveConfig::default()));
//! let slot = LiveFrameSlot::new();
//! let metrics = Arc::new(MetricsRegistry::new()?);
//!
//! let pipeline = IngestPipeline::new(
//!     FrameCodec::default(),
//!     slot.clone(),
//!     archive.clone(),
//!     timezone,
//!     metrics,
//! );
//! pipeline.ingest(raw).await?;
//!
//! let history = HistoryService::new(archive, timezone);
//! let page = history.query(HistoryFilter::default(), 1).await?;
//! println!("{} frames on page 1 of {}", page.len(), page.total_pages);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod archive;
pub mod codec;
pub mod config;
pub mod history;
pub mod ingest;
pub mod live;
pub mod metrics;
pub mod server;

// Re-export commonly used types at crate root
pub use archive::{BoundedArchive, FrameRecord, FrameStore, MemoryFrameStore, StoreError};
pub use codec::{CodecError, FrameCodec};
pub use config::{ConfigError, FileConfig, StoreBackend};
pub use history::{HistoryFilter, HistoryPage, HistoryService};
pub use ingest::{IngestError, IngestPipeline};
pub use live::LiveFrameSlot;
pub use metrics::MetricsRegistry;
pub use server::{AppState, Server, ServerError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
