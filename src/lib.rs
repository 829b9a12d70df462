pub mod adapters;
pub mod boundary;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{http::ReqwestTransport, AdapterConfig, LeadAdapter};
pub use boundary::{respond, LegacyResponse};
pub use config::RelayConfig;
pub use core::relay::{LeadRelay, RunFlags, TargetOutcome};
pub use core::reporter::Reporter;
pub use domain::model::{Delivery, FailureDetail, FormContext, LeadRecord};
pub use utils::error::{RelayError, Result};
