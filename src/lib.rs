#![allow(clippy::needless_range_loop)]

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod activation;
pub mod adamw;
pub mod config;
pub mod dataset;
pub mod error;
pub mod loss;
pub mod lstm;
pub mod network;
pub mod rnn;
pub mod scan;
pub mod simple;
pub mod stop_condition;
pub mod tensor;
pub mod train;

pub use crate::activation::*;
pub use crate::adamw::*;
pub use crate::config::*;
pub use crate::dataset::*;
pub use crate::error::{Result, RnnError};
pub use crate::loss::*;
pub use crate::lstm::*;
pub use crate::network::*;
pub use crate::rnn::*;
pub use crate::simple::*;
pub use crate::scan::{scan, ScanOutput};
pub use crate::stop_condition::*;
pub use crate::tensor::{Cpu, CpuAutodiff, Matrix};
pub use crate::train::*;
