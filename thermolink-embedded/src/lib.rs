#![no_std]

extern crate alloc;

pub mod error;
pub mod link;
pub mod node;
pub mod power;
pub mod report;
pub mod sample;
pub mod schedule;
pub mod time;

pub use error::*;
pub use link::*;
pub use node::*;
pub use power::*;
pub use report::*;
pub use sample::*;
pub use schedule::*;
pub use time::*;
