pub mod connection;
pub mod run;
pub mod validated;
