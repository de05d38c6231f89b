pub mod error;
pub mod lifecycle;
pub mod model;
pub mod routes;
pub mod store;
