pub mod conf;
pub mod controller;
pub mod core;
pub mod fetch;
pub mod mutation;
pub mod query;
pub mod remote;
pub mod store;

#[cfg(feature = "testutil")]
pub mod testutil;
