//! # Game Implementations
//!
//! Engines implementing the `Game` and `Symmetric` traits. The oracle,
//! enumeration and augmentation code is generic over them.

pub mod tictactoe;
