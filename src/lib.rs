//! Tsume pool: a stock of pre-solved mate problems per difficulty class,
//! replenished and pruned by scheduled jobs and served over HTTP.

pub mod blob;
pub mod codec;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod remote;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
