//! Feed client for the FIDS flight-status service.
//!
//! [`HttpClient`] is the transport seam, [`FlightFeed`] is what the poll loop
//! talks to, and [`HttpFeed`] joins the two.

mod basic;
mod client;
mod feed;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use feed::{FlightFeed, HttpFeed, endpoint};
