use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};
use triphase::switcher::SwitcherCommand;
use triphase::{Config, PhaseSwitcher, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    triphase::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Triphase phase switcher starting up");

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<SwitcherCommand>();
    let (web_host, web_port) = (config.web.host.clone(), config.web.port);

    // The crate ships no hardware transports; the binary runs against the
    // loopback collaborators. Integrators embed `PhaseSwitcher` with their
    // own trait implementations instead.
    let evse = triphase::sim::SimEvse::new();
    let relay = triphase::sim::SimQuadRelay::new();
    let digital_in = triphase::sim::SimDigitalIn::new();
    let meter = triphase::sim::SimMeter::new();

    let switcher = PhaseSwitcher::new(
        config.clone(),
        Box::new(evse),
        Box::new(relay),
        Box::new(digital_in),
        Box::new(meter),
        cmd_rx,
    );

    match switcher {
        Ok(switcher) => {
            let switcher = switcher.with_config_path(triphase::config::PRIMARY_CONFIG_PATH);
            let app_state = web::AppState {
                commands: cmd_tx.clone(),
                snapshot_rx: switcher.snapshot_rx(),
                history_rx: switcher.history_rx(),
                config_rx: switcher.config_rx(),
                initialized: true,
            };

            let web_task = tokio::spawn(async move {
                if let Err(e) = web::serve(app_state, &web_host, web_port).await {
                    error!("Web server error: {}", e);
                }
            });

            let result = switcher.run().await;
            web_task.abort();
            result.map_err(|e| anyhow::anyhow!("Switcher error: {}", e))
        }
        Err(e) => {
            // Module stays disabled for this boot; keep the web surface up so
            // clients get a clear "not initialized" answer.
            error!("Phase switcher disabled: {}", e);
            let app_state = web::AppState::uninitialized(cmd_tx.clone(), config);
            web::serve(app_state, &web_host, web_port).await
        }
    }
}
