pub mod error;
pub mod load;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    connection::{ConnectionSettings, TransferConfig},
    run::{DEFAULT_BATCH_SIZE, RunConfig},
    validated::ValidatedRunConfig,
};
