//! Builds an hourly economic dispatch model of the ERCOT grid from public data and solves it over
//! a rolling horizon.
#![warn(missing_docs)]
pub mod assembly;
pub mod bid;
pub mod cli;
pub mod emissions;
pub mod fallback;
pub mod fuel;
pub mod horizon;
pub mod id;
pub mod input;
pub mod load;
pub mod log;
pub mod model;
pub mod network;
pub mod optimiser;
pub mod output;
pub mod reconcile;
pub mod renewable;
pub mod series;
pub mod settings;
pub mod simulation;
pub mod technology;
pub mod time;
pub mod unit;
pub mod units;
pub mod zone;

#[cfg(test)]
mod fixture;
