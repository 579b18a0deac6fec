pub mod controller;
pub mod session;
pub mod store;
