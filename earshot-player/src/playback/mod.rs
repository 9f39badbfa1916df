//! Playback engine, transport seam and asset prefetching

pub mod asset;
pub mod engine;
pub mod http_loader;
pub mod prefetch;
pub mod transport;

pub use asset::{Asset, AssetLoader, LoadError};
pub use engine::{Player, PlayerSnapshot};
pub use http_loader::HttpAssetLoader;
pub use prefetch::{AssetQueue, LoadFailure, ReadyAsset};
pub use transport::{Transport, TransportEvent};
