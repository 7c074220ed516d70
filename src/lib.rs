pub mod analysis_fetch;
pub mod analysis_worker;
pub mod config;
pub mod distribution;
pub mod http_client;
pub mod result_cache;
pub mod state;
