//! Presence detection
//!
//! Each tick, a set of named signals votes on whether anyone is still in
//! the stall; the debouncer turns those votes into one end-of-session event.

mod debouncer;
mod signal;

pub use debouncer::{Presence, PresenceDebouncer, PresenceEvent};
pub use signal::{AudioSignal, DistanceMatch, DistanceSignal, HumiditySignal, PresenceSignal, Vote};
