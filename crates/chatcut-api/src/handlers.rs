//! Request handlers.

pub mod colab;
pub mod health;

pub use colab::*;
pub use health::*;
