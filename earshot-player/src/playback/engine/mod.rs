//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: command surface, worker lifecycle, transport and prefetch observers
//! - `queue.rs`: queue commands (add, remove, move, stop)
//!
//! All state mutation happens on one worker task. [`Player`] methods enqueue a
//! command and return immediately; outcomes are observable only through the
//! state publisher.

mod core;
mod queue;

pub use self::core::{Player, PlayerSnapshot};
