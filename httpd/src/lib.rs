//! # Fibre HTTPD
//!
//! A small HTTP service assembled through `fibre_app`: an echo route and a
//! greeting route, collected into a multiplexer and served by a listener
//! whose start and stop are driven by the application lifecycle.

mod config;
mod error;
mod handlers;
mod logging;
mod route;
mod server;
mod service;

pub use config::{find_config_file, Config, CONFIG_PATH_VAR};
pub use error::{Error, Result};
pub use handlers::{EchoHandler, HelloHandler};
pub use logging::init_logging;
pub use route::{text_response, Route, ServeMux, ROUTES};
pub use server::HttpServer;
pub use service::{app_builder, as_route, new_http_server, new_serve_mux};
