//! Memory Source Abstraction
//!
//! Where the prefilter gets its bytes and region layouts from:
//! - Live process attachment via `LiveProcess`
//! - /proc/pid/maps parsing and region filtering
//! - Mock sources for testing

mod maps;
#[cfg(test)]
mod mock;
mod process;
mod traits;

pub use maps::{parse_maps_line, read_maps, MapsEntry, RegionFilter};
#[cfg(test)]
pub use mock::MockMemorySource;
pub use process::{find_process, get_tgid, LiveProcess};
pub use traits::MemorySource;
