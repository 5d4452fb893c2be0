//! Background write load for exercising the store under contention

mod config;
mod errors;
mod lorem;
mod simulator;

pub use config::LoadSimConfig;
pub use errors::{LoadSimError, Result};
pub use lorem::sentence;
pub use simulator::{
    key_count, random_notes, random_notes_with, ErrorSink, LoadSimHandle, LoadSimulator, Mutation,
};
