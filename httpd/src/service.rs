//! Assembles the service from providers.

use std::sync::Arc;

use fibre_app::{App, AppBuilder, BoxError, Construction, Hook, Invoke, Key, Provider, ProviderBuilder};

use crate::config::Config;
use crate::handlers::{EchoHandler, HelloHandler};
use crate::route::{Route, ServeMux, ROUTES};
use crate::server::HttpServer;

/// Publishes the route built by `constructor` as a member of the routes
/// group instead of as its concrete type.
pub fn as_route<R, F>(builder: ProviderBuilder, constructor: F) -> Provider
where
  R: Route + 'static,
  F: Fn(&mut Construction<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
{
  builder
    .result(Key::grouped::<dyn Route>(ROUTES))
    .build(move |ctx| {
      let route: Arc<dyn Route> = Arc::new(constructor(ctx)?);
      ctx.provide_grouped(ROUTES, route)
    })
}

pub fn new_serve_mux() -> Provider {
  Provider::builder("new_serve_mux")
    .param(Key::grouped::<dyn Route>(ROUTES))
    .value(|ctx| Ok(ServeMux::new(ctx.get_group::<dyn Route>(ROUTES)?)))
}

/// The server bound to the configured address, registered as a lifecycle
/// resource.
pub fn new_http_server() -> Provider {
  Provider::builder("new_http_server")
    .param(Key::of::<Config>())
    .param(Key::of::<ServeMux>())
    .result(Key::of::<HttpServer>())
    .build(|ctx| {
      let config = ctx.get::<Config>()?;
      let mux = ctx.get::<ServeMux>()?;
      let server = Arc::new(HttpServer::new(config.addr, mux));
      ctx.on_lifecycle(Hook::for_resource("http_server", Arc::clone(&server)))?;
      ctx.provide(server)
    })
}

/// Every provider of the service, with `config` supplied as a value and the
/// server forced by an invoke target.
pub fn app_builder(config: Config) -> AppBuilder {
  App::builder()
    .start_timeout(config.start_timeout)
    .stop_timeout(config.shutdown_timeout)
    .provide(Provider::supply(config))
    .provide(new_http_server())
    .provide(new_serve_mux())
    .provide(as_route(Provider::builder("new_echo_handler"), |_| {
      Ok(EchoHandler::new())
    }))
    .provide(as_route(Provider::builder("new_hello_handler"), |_| {
      Ok(HelloHandler::new())
    }))
    .invoke(Invoke::requiring("serve_http", [Key::of::<HttpServer>()]))
}
