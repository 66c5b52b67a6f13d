//! London Air Quality Network (`api.erg.ic.ac.uk`) client.

mod client;

pub use client::{DEFAULT_BASE_URL, LondonAirClient, parse_site_data, parse_sites};
