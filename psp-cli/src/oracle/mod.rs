//! Oracles backed by external programs

mod command;

pub use command::{CommandDiscretizer, CommandOracle};
