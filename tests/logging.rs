mod common;

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use common::{exact_options, executor, ScriptedTransport, Step};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer, Registry,
};
use webclient_executor::{RequestSpec, RetryOn};

/// Collects the message of every ERROR event.
#[derive(Clone, Default)]
struct ErrorEvents {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorEvents {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages mutex").clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.messages.lock().expect("messages mutex").push(visitor.0);
        }
    }
}

fn capture() -> (ErrorEvents, tracing::subscriber::DefaultGuard) {
    let events = ErrorEvents::default();
    let guard = tracing::subscriber::set_default(Registry::default().with(events.clone()));
    (events, guard)
}

fn spec() -> RequestSpec {
    RequestSpec::get("http://service.local/items")
        .build()
        .expect("must build spec")
}

#[tokio::test(start_paused = true)]
async fn terminal_failure_is_logged_exactly_once() {
    let (events, _guard) = capture();
    let transport = ScriptedTransport::new([
        Step::Respond(404, "not found"),
        Step::Respond(404, "not found"),
        Step::Respond(404, "not found"),
        Step::Respond(404, "not found"),
    ]);

    executor(&transport, exact_options(RetryOn::Any))
        .execute(spec())
        .await
        .expect_err("must fail");

    let messages = events.messages();
    assert_eq!(transport.call_count(), 4);
    assert_eq!(messages.len(), 1, "got {messages:?}");
    assert!(messages[0].contains("not found"));
}

#[tokio::test(start_paused = true)]
async fn recovered_request_logs_no_error() {
    let (events, _guard) = capture();
    let transport = ScriptedTransport::new([
        Step::Fail("connection reset"),
        Step::Respond(200, "ok"),
    ]);

    executor(&transport, exact_options(RetryOn::Any))
        .execute(spec())
        .await
        .expect("must recover");

    assert!(events.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_request_is_logged_once() {
    let (events, _guard) = capture();
    let transport = ScriptedTransport::new(Vec::<Step>::new());
    let spec = RequestSpec::delete("http://service.local/items/1")
        .text("body")
        .build()
        .expect("must build");

    executor(&transport, exact_options(RetryOn::Any))
        .execute(spec)
        .await
        .expect_err("must be rejected");

    let messages = events.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("DELETE"));
}

#[tokio::test(start_paused = true)]
async fn eager_failure_is_logged_once() {
    let (events, _guard) = capture();
    let transport = ScriptedTransport::new([Step::Respond(500, "boom")]);
    let mut options = exact_options(RetryOn::Any);
    options.retry.max_retries = 0;

    executor(&transport, options)
        .execute_async(spec())
        .await
        .expect_err("must fail");

    let messages = events.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("boom"));
}
