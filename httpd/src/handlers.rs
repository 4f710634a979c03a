//! The routes served by `fibre_httpd`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use tracing::debug;

use crate::route::{text_response, Route};

/// Replies with the request body, unchanged.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl EchoHandler {
  pub fn new() -> Self {
    Self
  }
}

impl Route for EchoHandler {
  fn pattern(&self) -> &str {
    "/echo"
  }

  fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
    let body = request.into_body();
    debug!(bytes = body.len(), "echoing request body");
    Response::new(Full::new(body))
  }
}

/// Greets whoever is named in the request body.
#[derive(Debug, Default)]
pub struct HelloHandler;

impl HelloHandler {
  pub fn new() -> Self {
    Self
  }
}

impl Route for HelloHandler {
  fn pattern(&self) -> &str {
    "/hello"
  }

  fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
    let name = request.body();
    debug!(name = %String::from_utf8_lossy(name), "greeting");
    text_response(StatusCode::OK, [&b"Hello, "[..], &name[..], &b"\n"[..]].concat())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use http_body_util::BodyExt;

  async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
    match response.into_body().collect().await {
      Ok(collected) => collected.to_bytes(),
      Err(never) => match never {},
    }
  }

  #[tokio::test]
  async fn test_echo_returns_body_verbatim() {
    // Arrange
    let request = Request::new(Bytes::from_static(b"\x00raw bytes\xff"));

    // Act
    let response = EchoHandler::new().handle(request);

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_of(response).await, Bytes::from_static(b"\x00raw bytes\xff"));
  }

  #[tokio::test]
  async fn test_hello_greets_body() {
    // Arrange
    let request = Request::new(Bytes::from_static(b"gopher"));

    // Act
    let response = HelloHandler::new().handle(request);

    // Assert
    assert_eq!(body_of(response).await, Bytes::from_static(b"Hello, gopher\n"));
  }

  #[tokio::test]
  async fn test_hello_keeps_raw_body_bytes() {
    // Arrange
    let request = Request::new(Bytes::from_static(b"caf\xe9"));

    // Act
    let response = HelloHandler::new().handle(request);

    // Assert
    assert_eq!(body_of(response).await, Bytes::from_static(b"Hello, caf\xe9\n"));
  }

  #[test]
  fn test_patterns() {
    assert_eq!(EchoHandler::new().pattern(), "/echo");
    assert_eq!(HelloHandler::new().pattern(), "/hello");
  }
}
