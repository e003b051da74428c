#![allow(dead_code)]

pub mod fixtures;
pub mod writer;

pub use fixtures::*;
pub use writer::*;
