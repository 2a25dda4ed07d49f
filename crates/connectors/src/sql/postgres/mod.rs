pub mod destination;
pub mod params;
pub mod query;
pub mod utils;

pub use destination::PgDestination;
