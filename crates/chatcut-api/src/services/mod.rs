//! Business logic services.

pub mod colab;

pub use colab::{ColabService, Rejection};
