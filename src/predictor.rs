//! Branch predictor state: the BTB, counter tables, and the predictor
//! which ties them together.

pub mod table;
pub mod counter;
pub mod btb;
pub mod pht;
pub mod two_level;

pub use table::*;
pub use counter::*;
pub use btb::*;
pub use pht::*;
pub use two_level::*;
