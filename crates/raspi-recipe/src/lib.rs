//! Generates per-target image build recipes for Raspberry Pi boards from a
//! single master template.

pub mod config;
pub mod error;
pub mod facts;
pub mod generate;
pub mod render;
pub mod sanitize;
pub mod target;
pub mod util;

pub use error::{Error, ErrorKind, Result};
pub use facts::FactBundle;
pub use target::{Release, Revision, Target};
