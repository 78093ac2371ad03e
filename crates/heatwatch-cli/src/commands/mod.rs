pub mod config;
pub mod cutoff;
pub mod log;
pub mod rest;
pub mod status;
pub mod worker;
pub mod zone;
