//! Binds verified operational callsigns to scheduled flights by
//! reconciling live aircraft positions against schedule/status feeds.

pub mod adapters;
pub mod callsign;
pub mod candidate;
pub mod config;
pub mod geodesy;
pub mod log_format;
pub mod matcher;
pub mod observation;
pub mod reference;
pub mod route;
pub mod schedule;
pub mod store;
pub mod worker;
