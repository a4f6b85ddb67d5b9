use anyhow::Result;

mod app;
mod config;
mod conversation;
mod handler;
mod ollama;
mod prompt;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        // Reap any completion or model-listing task that finished; the
        // tick event guarantees we get here shortly after completion.
        app.poll_tasks().await;
    }

    Ok(())
}
