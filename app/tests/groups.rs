use fibre_app::{Container, Error, Key, Lookup, NopLogger, Provider};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// --- Test Fixtures ---

trait Route: Send + Sync {
  fn pattern(&self) -> &str;
}

struct StaticRoute(&'static str);
impl Route for StaticRoute {
  fn pattern(&self) -> &str {
    self.0
  }
}

struct Mux {
  patterns: Vec<String>,
}

fn container() -> Container {
  Container::with_event_logger(Arc::new(NopLogger))
}

fn route(pattern: &'static str) -> Provider {
  Provider::builder(format!("new_route {}", pattern))
    .result(Key::grouped::<dyn Route>("routes"))
    .build(move |ctx| {
      let route: Arc<dyn Route> = Arc::new(StaticRoute(pattern));
      ctx.provide_grouped("routes", route)
    })
}

fn mux() -> Provider {
  Provider::builder("new_mux")
    .param(Key::grouped::<dyn Route>("routes"))
    .value(|ctx| {
      let routes = ctx.get_group::<dyn Route>("routes")?;
      Ok(Mux {
        patterns: routes.iter().map(|r| r.pattern().to_owned()).collect(),
      })
    })
}

// --- Group Tests ---

#[test]
fn test_group_members_follow_declaration_order() {
  // Arrange: unrelated providers interleaved with the members.
  let mut container = container();
  container.provide(route("/echo")).unwrap();
  container.provide(Provider::supply(1u32)).unwrap();
  container.provide(mux()).unwrap();
  container.provide(route("/hello")).unwrap();
  container.provide(Provider::supply_named("x", 2u32)).unwrap();
  container.provide(route("/health")).unwrap();

  // Act
  let mux = container.resolve::<Mux>().unwrap();
  let direct = container.resolve_group::<dyn Route>("routes").unwrap();

  // Assert
  assert_eq!(mux.patterns, vec!["/echo", "/hello", "/health"]);
  assert_eq!(
    direct.iter().map(|r| r.pattern()).collect::<Vec<_>>(),
    vec!["/echo", "/hello", "/health"]
  );
}

#[test]
fn test_group_members_are_cached_like_singletons() {
  // Arrange
  let mut container = container();
  container.provide(route("/echo")).unwrap();

  // Act
  let first = container.resolve_group::<dyn Route>("routes").unwrap();
  let second = container.resolve_group::<dyn Route>("routes").unwrap();

  // Assert
  assert!(Arc::ptr_eq(&first[0], &second[0]));
}

#[test]
fn test_empty_group_resolves_to_empty_sequence() {
  // Arrange
  let mut container = container();
  container.provide(mux()).unwrap();

  // Act
  let mux = container.resolve::<Mux>().unwrap();

  // Assert
  assert!(mux.patterns.is_empty());
  assert!(container
    .resolve_group::<dyn Route>("routes")
    .unwrap()
    .is_empty());
}

#[test]
fn test_group_member_is_not_resolvable_as_singular() {
  // Arrange
  let mut container = container();
  container.provide(route("/echo")).unwrap();

  // Act
  let result = container.resolve::<dyn Route>();

  // Assert
  assert!(matches!(result, Err(Error::MissingBinding { .. })));
}

#[test]
fn test_capability_bound_singular_and_grouped_at_once() {
  // Arrange
  let mut container = container();
  container.provide(route("/echo")).unwrap();
  container
    .provide(
      Provider::builder("new_default_route")
        .result(Key::of::<dyn Route>())
        .build(|ctx| {
          let route: Arc<dyn Route> = Arc::new(StaticRoute("/"));
          ctx.provide(route)
        }),
    )
    .unwrap();

  // Act
  let single = container.resolve::<dyn Route>().unwrap();
  let group = container.resolve_group::<dyn Route>("routes").unwrap();

  // Assert
  assert_eq!(single.pattern(), "/");
  assert_eq!(group.len(), 1);
  assert_eq!(group[0].pattern(), "/echo");
}

#[test]
fn test_one_provider_contributes_several_members_in_result_order() {
  // Arrange
  let mut container = container();
  container.provide(route("/first")).unwrap();
  container
    .provide(
      Provider::builder("new_admin_routes")
        .result(Key::grouped::<dyn Route>("routes"))
        .result(Key::grouped::<dyn Route>("routes"))
        .build(|ctx| {
          let status: Arc<dyn Route> = Arc::new(StaticRoute("/admin/status"));
          let config: Arc<dyn Route> = Arc::new(StaticRoute("/admin/config"));
          ctx.provide_grouped("routes", status)?;
          ctx.provide_grouped("routes", config)
        }),
    )
    .unwrap();
  container.provide(route("/last")).unwrap();

  // Act
  let patterns: Vec<String> = container
    .resolve_group::<dyn Route>("routes")
    .unwrap()
    .iter()
    .map(|r| r.pattern().to_owned())
    .collect();

  // Assert
  assert_eq!(
    patterns,
    vec!["/first", "/admin/status", "/admin/config", "/last"]
  );
  match container.registry().lookup(&Key::grouped::<dyn Route>("routes")) {
    Some(Lookup::Group(members)) => {
      let labels: Vec<&str> = members.iter().map(|d| d.label()).collect();
      assert_eq!(
        labels,
        vec!["new_route /first", "new_admin_routes", "new_route /last"]
      );
    }
    other => panic!("expected a group lookup, got {:?}", other),
  }
}

#[test]
fn test_group_cycle_is_detected() {
  // Arrange: the mux needs every route, and one route needs the mux.
  let mut container = container();
  container.provide(mux()).unwrap();
  container
    .provide(
      Provider::builder("new_index_route")
        .param(Key::of::<Mux>())
        .result(Key::grouped::<dyn Route>("routes"))
        .build(|ctx| {
          let route: Arc<dyn Route> = Arc::new(StaticRoute("/"));
          ctx.provide_grouped("routes", route)
        }),
    )
    .unwrap();

  // Act
  let err = match container.resolve::<Mux>() {
    Err(err) => err,
    Ok(_) => panic!("expected the cycle to be detected"),
  };

  // Assert
  match err {
    Error::Cycle { path } => assert_eq!(
      path,
      vec![
        Key::of::<Mux>(),
        Key::grouped::<dyn Route>("routes"),
        Key::of::<Mux>()
      ]
    ),
    other => panic!("expected a cycle, got {:?}", other),
  }
}
