//! # Earshot Player Library (earshot-player)
//!
//! Streaming playback core for a watch audio player.
//!
//! **Purpose:** Load network audio assets in the background, keep a playback queue
//! split between the transport (current item plus ready items) and a prefetch
//! backlog, and publish one consistent [`PlaybackState`] despite asynchronous,
//! interrupt-driven and fallible I/O.
//!
//! **Architecture:**
//! - [`AssetQueue`]: sequential background loader, readiness in submission order
//! - [`Player`]: actor owning the transport; fire-and-forget commands, state via
//!   a latest-value publisher
//! - [`PlayStatistics`]: recents list and play history persisted through
//!   [`earshot_fs::FileSystem`]
//! - [`Library`]: folder-structured store of saved stations and podcasts
//!
//! The audio transport itself is an external collaborator behind [`Transport`].
//!
//! [`PlaybackState`]: earshot_common::PlaybackState

pub mod config;
pub mod error;
pub mod library;
pub mod playback;
pub mod statistics;

pub use config::{PlayerConfig, StatisticsConfig};
pub use error::{Error, Result};
pub use library::Library;
pub use playback::{
    Asset, AssetLoader, AssetQueue, HttpAssetLoader, LoadError, LoadFailure, Player,
    PlayerSnapshot, ReadyAsset, Transport, TransportEvent,
};
pub use statistics::{PlayRecord, PlayStatistics};
