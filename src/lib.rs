pub mod alerts;
pub mod billing;
pub mod company;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rates;
pub mod renderer;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod template;
