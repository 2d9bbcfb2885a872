use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a minimal config file for the CLI to read.
fn create_minimal_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"appwrite:\n  endpoint: https://appwrite.invalid/v1\n  project_id: storefront\n  database_id: db\nseed:\n  bucket_id: images\n  collections:\n    categories: categories\n    customizations: customizations\n    menu: menu\n    menu_customizations: menu_customizations\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn validate_accepts_bundled_dataset() {
    let mut cmd = Command::cargo_bin("storefront-seed").expect("Binary exists");
    cmd.arg("validate");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dataset is valid"));
}

#[test]
fn rust_log_controls_log_verbosity() {
    let mut cmd = Command::cargo_bin("storefront-seed").expect("Binary exists");
    cmd.arg("validate").env("RUST_LOG", "debug");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dataset validated without problems"));

    let mut quiet = Command::cargo_bin("storefront-seed").expect("Binary exists");
    quiet.arg("validate").env("RUST_LOG", "warn");
    quiet
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset validated without problems").not());
}

#[test]
fn validate_rejects_dataset_with_unresolved_category() {
    let data = NamedTempFile::new().expect("temp dataset");
    write(
        data.path(),
        r#"{
  "categories": [{ "name": "Pizzas", "description": "Cheesy" }],
  "customizations": [{ "name": "Extra Cheese", "price": 25, "type": "topping" }],
  "menu": [{
    "name": "Cheeseburger",
    "description": "Beef patty",
    "image_url": "https://cdn.example.com/burger.png",
    "price": 25.99,
    "rating": 4.5,
    "calories": 550,
    "protein": 25,
    "category_name": "Burgers",
    "customizations": ["Extra Cheese"]
  }]
}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("storefront-seed").expect("Binary exists");
    cmd.arg("validate").arg("--data").arg(data.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unresolved category \"Burgers\""));
}

#[test]
fn seed_refuses_to_run_without_api_key() {
    let config = create_minimal_config();
    let mut cmd = Command::cargo_bin("storefront-seed").expect("Binary exists");
    cmd.arg("seed")
        .arg("--config")
        .arg(config.path())
        .env_remove("APPWRITE_API_KEY");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("APPWRITE_API_KEY"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use storefront_seed::cli::{run, Cli, Commands};

    // A missing config file makes run() fail after the first event.
    let cli = Cli {
        command: Commands::Seed {
            config: std::path::PathBuf::from("dummy.yaml"),
            data: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "missing config must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
