pub mod classifier;
pub mod dispatcher;
pub mod mapper;
pub mod normalizer;
pub mod procedure;
pub mod relay;
pub mod reporter;
pub mod session;

pub use crate::domain::model::{Delivery, FailureDetail, FormContext, LeadRecord};
pub use crate::utils::error::Result;
