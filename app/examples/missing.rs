use fibre_app::{Container, Error, Key, Provider};

struct Database;
struct ReportService;

fn main() {
  let mut container = Container::new();
  container
    .provide(
      Provider::builder("new_report_service")
        .param(Key::of::<Database>())
        .value(|_| Ok(ReportService)),
    )
    .expect("registration never fails for distinct keys");

  // --- Resolving a service whose dependency was never provided ---
  println!("Attempting to resolve a service with a missing dependency...");

  match container.resolve::<ReportService>() {
    Ok(_) => panic!("Should not have resolved the service!"),
    Err(Error::MissingBinding { key, required_by }) => {
      println!("Missing {} (required by '{}'), as expected.", key, required_by);
    }
    Err(other) => panic!("Unexpected error: {}", other),
  }

  // --- Optional parameters tolerate the absence ---
  container
    .provide(
      Provider::builder("new_report_count")
        .param(Key::of::<Database>().optional())
        .value(|ctx| Ok(ctx.get_optional::<Database>()?.map_or(0u32, |_| 1))),
    )
    .expect("registration never fails for distinct keys");

  let count = container.resolve::<u32>().expect("optional parameter resolves");
  println!("Reports without a database: {}", count);
  assert_eq!(*count, 0);
}
