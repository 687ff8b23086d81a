#![doc = include_str!("../README.md")]

mod batch;
mod common;
mod digest;

pub use batch::*;
pub use common::*;
pub use digest::*;
