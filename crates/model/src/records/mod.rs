pub mod batch;
pub mod page;
pub mod record;
