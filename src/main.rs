use anyhow::Result;
use tracing::info;

mod app;
mod config;
mod gateway;
mod handler;
mod logging;
mod store;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let config = Config::load().unwrap_or_else(|_| Config::new());
    info!(
        "starting, endpoint {} prefix {}",
        config.endpoint(),
        config.phone_prefix()
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(&config, events.sender());

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
    }
    Ok(())
}
