mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{DesktopGuiApp, StartupConfig};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the taskboard server.
    #[arg(long, default_value = "")]
    server_url: String,
    /// Username to prefill on the sign-in screen.
    #[arg(long, default_value = "")]
    username: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let startup = StartupConfig {
        server_url: args.server_url,
        username: args.username,
    };

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Taskboard Desktop")
            .with_inner_size([1080.0, 720.0])
            .with_min_inner_size([760.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Taskboard Desktop",
        options,
        Box::new(|cc| {
            Ok(Box::new(DesktopGuiApp::from_eframe(
                cmd_tx, ui_rx, cc, startup,
            )))
        }),
    )
}
