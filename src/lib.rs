mod admin;
mod capture;
mod config;
mod constants;
mod delivery;
mod errors;
mod metadata;
mod metrics;
mod replica;
mod service;
mod storage;
mod targets;
mod type_config;
pub mod utils;

pub use admin::*;
pub use capture::*;
pub use config::*;
pub use delivery::*;
pub use errors::*;
pub use metadata::*;
pub use metrics::*;
pub use replica::*;
pub use service::*;
pub use storage::*;
pub use targets::*;
pub use type_config::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
