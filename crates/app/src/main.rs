use std::time::Duration;

use engine::{
    Aggregates, JsonFileStore, Notifier, Services, SessionController, Simulator, StateStore,
};

mod commands;
mod error;
mod settings;
mod shell;

#[tokio::main(flavor = "current_thread")]
async fn main() -> error::Result<()> {
    let settings = settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "agro={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("using state file {}", settings.state_path);
    let storage = JsonFileStore::open(&settings.state_path)?;
    let services = Services {
        store: StateStore::new(Aggregates::seeded()),
        notifier: Notifier::new(Duration::from_secs(settings.dismiss_after_secs)),
        gateway: Simulator::new(settings.simulator.clone()),
    };

    shell::Shell::new(SessionController::new(storage, services))
        .run()
        .await
}
