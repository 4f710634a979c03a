use fibre_app::{App, Hook, Invoke, Key, Provider, Shutdowner};
use std::time::Duration;

// A pool that must be opened before use and closed on shutdown.
struct ConnectionPool;

// A worker that depends on the pool and stops the application when done.
struct Worker;

#[tokio::main]
async fn main() -> fibre_app::Result<()> {
  let mut app = App::builder()
    .stop_timeout(Duration::from_secs(5))
    .provide(Provider::builder("new_pool").value(|ctx| {
      ctx.on_lifecycle(
        Hook::new("pool")
          .on_start(|_| async {
            println!("Opening connection pool...");
            Ok(())
          })
          .on_stop(|_| async {
            println!("Closing connection pool...");
            Ok(())
          }),
      )?;
      Ok(ConnectionPool)
    }))
    .provide(
      Provider::builder("new_worker")
        .param(Key::of::<ConnectionPool>())
        .param(Key::of::<Shutdowner>())
        .value(|ctx| {
          let shutdowner = ctx.get::<Shutdowner>()?;
          ctx.on_lifecycle(Hook::new("worker").on_start(move |_| async move {
            println!("Worker started, finishing shortly...");
            tokio::spawn(async move {
              tokio::time::sleep(Duration::from_millis(100)).await;
              shutdowner.shutdown();
            });
            Ok(())
          }))?;
          Ok(Worker)
        }),
    )
    .invoke(Invoke::requiring("run_worker", [Key::of::<Worker>()]))
    .build()?;

  // The pool starts before the worker and closes after it.
  app.run().await
}

