use fibre_app::{Container, Key, Provider};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {}: '{}'", to, message)
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}

struct Notifier {
  email: Arc<dyn MessageSender>,
  sms: Arc<dyn MessageSender>,
}

fn sender(name: &'static str, sender: Arc<dyn MessageSender>) -> Provider {
  Provider::builder(format!("new_{}_sender", name))
    .result(Key::named::<dyn MessageSender>(name))
    .build(move |ctx| ctx.provide_named(name, Arc::clone(&sender)))
}

fn main() -> fibre_app::Result<()> {
  // --- Registration ---
  // Both implementations are bound to the same capability under distinct names.
  let mut container = Container::new();
  container.provide(sender("email", Arc::new(EmailSender)))?;
  container.provide(sender("sms", Arc::new(SmsSender)))?;
  container.provide(
    Provider::builder("new_notifier")
      .param(Key::named::<dyn MessageSender>("email"))
      .param(Key::named::<dyn MessageSender>("sms"))
      .value(|ctx| {
        Ok(Notifier {
          email: ctx.get_named::<dyn MessageSender>("email")?,
          sms: ctx.get_named::<dyn MessageSender>("sms")?,
        })
      }),
  )?;

  // --- Resolution ---
  let notifier = container.resolve::<Notifier>()?;
  let result1 = notifier.email.send("test@example.com", "Hello from Fibre!");
  let result2 = notifier.sms.send("+123456789", "Hello from Fibre!");

  println!("{}", result1);
  println!("{}", result2);

  assert!(result1.contains("email"));
  assert!(result2.contains("SMS"));
  Ok(())
}
