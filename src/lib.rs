// Library for tests to access modules

pub mod clock;
pub mod config;
pub mod heatmap;
pub mod metrics_repo;
pub mod models;
pub mod routes;
pub mod suggestions;
pub mod version;
pub mod worker;
