pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod services;
pub mod validation;

use crate::config::AppConfig;
use crate::services::WagerService;

#[derive(Clone)]
pub struct AppState {
    pub service: WagerService,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
