//! Routes and the multiplexer dispatching requests to them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Request, Response, StatusCode};
use tracing::debug;

/// Group tag under which every [`Route`] is collected.
pub const ROUTES: &str = "routes";

/// An HTTP handler that knows the path pattern it serves.
///
/// A pattern ending in `/` serves its whole subtree; any other pattern
/// matches the path exactly.
pub trait Route: Send + Sync {
  fn pattern(&self) -> &str;

  fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>>;
}

/// A `text/plain` response.
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
  let mut response = Response::new(Full::new(body.into()));
  *response.status_mut() = status;
  response.headers_mut().insert(
    header::CONTENT_TYPE,
    header::HeaderValue::from_static("text/plain; charset=utf-8"),
  );
  response
}

/// Dispatches requests to routes by path.
pub struct ServeMux {
  routes: HashMap<String, Arc<dyn Route>>,
}

impl ServeMux {
  /// Builds the mux from routes in registration order. A later route with
  /// the same pattern replaces an earlier one.
  pub fn new(routes: impl IntoIterator<Item = Arc<dyn Route>>) -> Self {
    let mut by_pattern = HashMap::new();
    for route in routes {
      by_pattern.insert(route.pattern().to_owned(), route);
    }
    Self { routes: by_pattern }
  }

  /// The route serving `path`: an exact match first, then the longest
  /// subtree pattern containing it.
  pub fn handler(&self, path: &str) -> Option<&Arc<dyn Route>> {
    if let Some(route) = self.routes.get(path) {
      return Some(route);
    }
    self
      .routes
      .iter()
      .filter(|(pattern, _)| pattern.ends_with('/') && path.starts_with(pattern.as_str()))
      .max_by_key(|(pattern, _)| pattern.len())
      .map(|(_, route)| route)
  }

  pub fn serve(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
    debug!(method = %request.method(), path = %request.uri().path(), "dispatching request");
    match self.handler(request.uri().path()) {
      Some(route) => route.handle(request),
      None => text_response(StatusCode::NOT_FOUND, "404 page not found\n"),
    }
  }

  /// Registered patterns, sorted.
  pub fn patterns(&self) -> Vec<&str> {
    let mut patterns: Vec<&str> = self.routes.keys().map(String::as_str).collect();
    patterns.sort_unstable();
    patterns
  }

  pub fn len(&self) -> usize {
    self.routes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.routes.is_empty()
  }
}

impl fmt::Debug for ServeMux {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServeMux")
      .field("patterns", &self.patterns())
      .finish()
  }
}
