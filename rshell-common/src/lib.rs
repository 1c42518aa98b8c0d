pub mod connection;
pub mod exec;

mod tests;
