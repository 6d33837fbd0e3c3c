//! Acquisition: getting page markup off the network.

pub mod fetcher;

pub use fetcher::{FetchedPage, Fetcher, USER_AGENT};
