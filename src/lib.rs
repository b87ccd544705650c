#![allow(clippy::type_complexity)]

pub mod error;
pub mod utils;
pub mod config;
pub mod games;
pub mod symmetry;
pub mod enumerate;
pub mod oracle;
pub mod records;
pub mod store;
pub mod augment;
