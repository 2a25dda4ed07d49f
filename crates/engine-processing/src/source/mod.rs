pub mod paged;
pub(crate) mod prefetch;
