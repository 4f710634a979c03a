//! The HTTP listener, run as a lifecycle resource.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use fibre_app::{BoxError, BoxFuture, Instant, Resource, StopTimeout};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::route::{text_response, ServeMux};

enum State {
  Idle,
  Running {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
  },
  Stopped,
}

/// Serves a [`ServeMux`] over HTTP/1 on a TCP listener.
///
/// Starting binds the listener and hands the accept loop to its own task;
/// stopping closes the listener, drains open connections and waits for the
/// task until the deadline. Both are idempotent.
pub struct HttpServer {
  addr: SocketAddr,
  mux: Arc<ServeMux>,
  state: Mutex<State>,
}

impl HttpServer {
  pub fn new(addr: SocketAddr, mux: Arc<ServeMux>) -> Self {
    Self {
      addr,
      mux,
      state: Mutex::new(State::Idle),
    }
  }

  /// The configured address.
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }

  /// The bound address while serving. Differs from [`addr`](Self::addr)
  /// when the configured port is 0.
  pub fn local_addr(&self) -> Option<SocketAddr> {
    match &*self.state.lock() {
      State::Running { local_addr, .. } => Some(*local_addr),
      _ => None,
    }
  }

  pub fn is_running(&self) -> bool {
    matches!(&*self.state.lock(), State::Running { .. })
  }

  async fn listen(&self) -> Result<(), BoxError> {
    if !matches!(&*self.state.lock(), State::Idle) {
      return Ok(());
    }

    let listener = TcpListener::bind(self.addr).await.map_err(|source| Error::Bind {
      addr: self.addr,
      source,
    })?;
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let mut state = self.state.lock();
    if !matches!(&*state, State::Idle) {
      // Started concurrently; our listener is dropped here.
      return Ok(());
    }
    info!(addr = %local_addr, "Starting HTTP server");
    let task = tokio::spawn(serve(listener, Arc::clone(&self.mux), shutdown_rx));
    *state = State::Running {
      local_addr,
      shutdown_tx,
      task,
    };
    Ok(())
  }

  async fn shutdown(&self, deadline: Instant) -> Result<(), BoxError> {
    let running = std::mem::replace(&mut *self.state.lock(), State::Stopped);
    let (local_addr, shutdown_tx, mut task) = match running {
      State::Running {
        local_addr,
        shutdown_tx,
        task,
      } => (local_addr, shutdown_tx, task),
      other => {
        // Never started: stay startable. Already stopped: stay stopped.
        if matches!(other, State::Idle) {
          *self.state.lock() = State::Idle;
        }
        return Ok(());
      }
    };

    info!(addr = %local_addr, "Stopping HTTP server");
    // The loop may already be gone; then there is nothing to signal.
    let _ = shutdown_tx.send(());
    match tokio::time::timeout_at(deadline, &mut task).await {
      Ok(Ok(())) => Ok(()),
      Ok(Err(join_err)) => Err(format!("http server task failed: {}", join_err).into()),
      Err(_) => {
        warn!(addr = %local_addr, "connections did not drain before the deadline, aborting");
        task.abort();
        Err(StopTimeout.into())
      }
    }
  }
}

impl Resource for HttpServer {
  fn start(&self, _deadline: Instant) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(self.listen())
  }

  fn stop(&self, deadline: Instant) -> BoxFuture<'_, Result<(), BoxError>> {
    Box::pin(self.shutdown(deadline))
  }
}

impl std::fmt::Debug for HttpServer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HttpServer")
      .field("addr", &self.addr)
      .field("local_addr", &self.local_addr())
      .field("mux", &self.mux)
      .finish()
  }
}

/// Accepts connections until `shutdown_rx` fires, then drains them.
async fn serve(listener: TcpListener, mux: Arc<ServeMux>, mut shutdown_rx: oneshot::Receiver<()>) {
  let builder = Builder::new(TokioExecutor::new());
  let graceful = GracefulShutdown::new();
  let mut join_set: JoinSet<()> = JoinSet::new();

  loop {
    tokio::select! {
      _ = &mut shutdown_rx => break,
      accept = listener.accept() => {
        let (stream, peer) = match accept {
          Ok(accepted) => accepted,
          Err(err) => {
            warn!(error = %err, "accept failed");
            continue;
          }
        };
        debug!(peer = %peer, "accepted connection");
        let mux = Arc::clone(&mux);
        let builder = builder.clone();
        let watcher = graceful.watcher();
        join_set.spawn(async move {
          let io = TokioIo::new(stream);
          let service = service_fn(move |request| handle_request(request, Arc::clone(&mux)));
          let connection = builder.serve_connection(io, service).into_owned();
          if let Err(err) = watcher.watch(connection).await {
            debug!(peer = %peer, error = %err, "connection closed with error");
          }
        });
      }
      Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
        if let Err(join_err) = joined {
          warn!(error = %join_err, "connection task failed");
        }
      }
    }
  }

  drop(listener);
  graceful.shutdown().await;
  while let Some(joined) = join_set.join_next().await {
    if let Err(join_err) = joined {
      warn!(error = %join_err, "connection task failed");
    }
  }
}

async fn handle_request(
  request: Request<Incoming>,
  mux: Arc<ServeMux>,
) -> Result<Response<Full<Bytes>>, Infallible> {
  let (parts, body) = request.into_parts();
  let body = match body.collect().await {
    Ok(collected) => collected.to_bytes(),
    Err(err) => {
      warn!(path = %parts.uri.path(), error = %err, "failed to read request");
      return Ok(text_response(StatusCode::BAD_REQUEST, "failed to read request\n"));
    }
  };
  Ok(mux.serve(Request::from_parts(parts, body)))
}
