use fibre_httpd::{app_builder, init_logging, Config, Result};
use tracing::error;

#[tokio::main]
async fn main() {
  if let Err(err) = run().await {
    error!(error = %err, "fibre_httpd failed");
    eprintln!("fibre_httpd: {}", err);
    std::process::exit(1);
  }
}

async fn run() -> Result<()> {
  let config = Config::load()?;
  init_logging(&config.log_level)?;
  let mut app = app_builder(config).build()?;
  app.run().await?;
  Ok(())
}
