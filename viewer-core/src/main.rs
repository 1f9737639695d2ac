//! src/main.rs
//! Course viewer TUI: sidebar tree, content panel, read tracking

use std::{
    io::{self, Stdout},
    panic::PanicHookInfo,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use viewer_core::{
    Logger,
    backend::{
        Backend, Renderers,
        external::{CommandFrame, CommandPlayer},
        http::HttpBackend,
        local::{HiddenExtensions, LocalBackend},
        markdown::CmarkRenderer,
        pages::PdftoppmRenderer,
    },
    config::{BackendConfig, Config, Overrides},
    controller::{
        actions::Action,
        event_loop::EventLoop,
        state_coordinator::{DispatchResult, StateCoordinator},
    },
    view::ui::UIRenderer,
};

type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

#[derive(Parser, Debug)]
#[command(name = "course-viewer", about = "Browse course content and track what you have read")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve the course from this directory
    #[arg(long, conflicts_with = "server")]
    root: Option<PathBuf>,

    /// Base URL of a running course server
    #[arg(long)]
    server: Option<String>,

    /// Extensions to hide in a local course, comma separated
    #[arg(long, value_delimiter = ',')]
    hide: Option<Vec<String>>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    config
        .apply(Overrides {
            root: cli.root,
            server: cli.server,
            hide: cli.hide,
        })
        .context("Invalid command line")?;

    let _log_guard: WorkerGuard =
        Logger::init_tracing(&config.logging).context("Failed to initialize logging")?;
    setup_panic_handler();
    info!(backend = ?config.backend, "Starting course viewer");

    let backend = build_backend(&config).await?;
    let renderers = build_renderers(&config)?;

    let app = App::new(&config, backend, renderers).context("Failed to initialize application")?;
    app.run().await.context("Application runtime error")?;

    info!("Application exited cleanly");
    Ok(())
}

async fn build_backend(config: &Config) -> Result<Backend> {
    match &config.backend {
        BackendConfig::Http { base_url, timeout } => {
            let http = HttpBackend::new(base_url, *timeout)
                .with_context(|| format!("Failed to create client for {base_url}"))?;
            Ok(Backend::from_shared(Arc::new(http)))
        }
        BackendConfig::Local {
            root,
            hidden_extensions,
            state_file,
        } => {
            let local = LocalBackend::open(
                root.clone(),
                HiddenExtensions::new(hidden_extensions.as_slice()),
                state_file.clone(),
            )
            .await
            .with_context(|| format!("Failed to open course at {}", root.display()))?;
            Ok(Backend::from_shared(Arc::new(local)))
        }
    }
}

fn build_renderers(config: &Config) -> Result<Renderers> {
    let timeout = match &config.backend {
        BackendConfig::Http { timeout, .. } => *timeout,
        BackendConfig::Local { .. } => std::time::Duration::from_secs(30),
    };
    let pages = PdftoppmRenderer::new(&config.pdf.command, config.pdf.scale, timeout)
        .context("Failed to create page renderer")?;

    Ok(Renderers {
        frame: Arc::new(CommandFrame::new(&config.browser_cmd)),
        markdown: Arc::new(CmarkRenderer::new()),
        pages: Arc::new(pages),
        media: Arc::new(CommandPlayer::new(&config.player_cmd)),
    })
}

struct App {
    terminal: AppTerminal,
    event_loop: EventLoop,
    coordinator: StateCoordinator,
    ui_renderer: UIRenderer,
}

impl App {
    fn new(config: &Config, backend: Backend, renderers: Renderers) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();

        let mut coordinator = StateCoordinator::new(backend, renderers, action_tx);
        coordinator.ui.show_status_bar = config.show_status_bar;

        let terminal = setup_terminal().context("Failed to initialize terminal")?;

        Ok(Self {
            terminal,
            event_loop: EventLoop::new(action_rx),
            coordinator,
            ui_renderer: UIRenderer::new(),
        })
    }

    async fn run(mut self) -> Result<()> {
        self.coordinator.start();
        info!("Starting event loop");

        loop {
            self.render()?;

            let Some(action) = self.event_loop.next_action().await else {
                break;
            };
            if matches!(self.coordinator.handle(action), DispatchResult::Terminate) {
                info!("Quit requested");
                break;
            }
        }

        let stats = self.ui_renderer.stats();
        info!(
            frames = stats.frames,
            skips = stats.skips,
            render_ms = stats.total.as_millis() as u64,
            "Event loop terminated cleanly"
        );
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        if !self.ui_renderer.should_render(&self.coordinator) {
            return Ok(());
        }

        let start = Instant::now();
        let Self {
            terminal,
            coordinator,
            ui_renderer,
            ..
        } = self;
        terminal
            .draw(|frame: &mut Frame<'_>| ui_renderer.render(frame, coordinator))
            .context("Failed to draw terminal")?;

        let duration = start.elapsed();
        if duration.as_millis() > 16 {
            warn!("Slow render: {}ms (target: <16ms)", duration.as_millis());
        } else {
            debug!(elapsed_us = duration.as_micros() as u64, "Frame drawn");
        }
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Err(e) = cleanup_terminal(&mut self.terminal) {
            warn!("Failed to cleanup terminal: {}", e);
        }
    }
}

fn setup_terminal() -> Result<AppTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;

    info!("Terminal setup complete");
    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut AppTerminal) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    info!("Terminal cleanup complete");
    Ok(())
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen);

        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
