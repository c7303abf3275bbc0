pub mod cli_interface;
pub mod device;
pub mod fs;
pub mod mkfs;
pub mod utils;
pub use device::{MmapImage, RamImage, SectorSource};
pub use fs::*;
