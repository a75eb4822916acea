#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod reading;
pub mod time;
pub mod update;
pub mod value;

pub use reading::*;
pub use time::*;
pub use update::*;
pub use value::*;
