mod terminal;

use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::load_settings, ChannelListController, ChatController, ClientContext,
    FileSelectionStore, LoginController, Page, RestBackend,
};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::terminal::TerminalView;

type Input = LinesStream<BufReader<Stdin>>;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    anon_key: Option<String>,
    #[arg(long)]
    selection_path: Option<PathBuf>,
}

struct App {
    ctx: ClientContext,
    view: Arc<TerminalView>,
    login: LoginController,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    if let Some(key) = args.anon_key {
        settings.anon_key = key;
    }
    if let Some(path) = args.selection_path {
        settings.selection_path = path;
    }
    settings.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    info!(backend_url = %settings.backend_url, "chat_term starting");

    let selection = FileSelectionStore::open(&settings.selection_path).with_context(|| {
        format!(
            "failed to open selection store '{}'",
            settings.selection_path.display()
        )
    })?;
    let view = Arc::new(TerminalView::new(Page::Login));
    let ctx = ClientContext::new(
        Arc::new(RestBackend::new(&settings.backend_url, &settings.anon_key)),
        view.clone(),
        Arc::new(selection),
    );
    let app = App {
        login: LoginController::new(ctx.clone()),
        ctx,
        view,
    };

    let mut input = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut page = Page::Login;
    loop {
        app.view.show(page);
        let next = match page {
            Page::Login => run_login(&app, &mut input).await?,
            Page::Channels => run_channels(&app, &mut input).await?,
            Page::Chat => run_chat(&app, &mut input).await?,
        };
        match next {
            Some(next) => page = next,
            None => break,
        }
    }

    info!("stdin closed, exiting");
    Ok(())
}

fn prompt(label: &str) -> Result<()> {
    print!("{label}");
    std::io::stdout().flush().context("failed to flush stdout")
}

async fn next_line(input: &mut Input) -> Result<Option<String>> {
    input
        .next()
        .await
        .transpose()
        .context("failed to read stdin")
}

/// Each page runner returns the page to show next, or `None` once stdin ends.
async fn run_login(app: &App, input: &mut Input) -> Result<Option<Page>> {
    if app.login.check_existing_session().await {
        return Ok(app.view.take_navigation());
    }
    loop {
        prompt("email: ")?;
        let Some(email) = next_line(input).await? else {
            return Ok(None);
        };
        prompt("password: ")?;
        let Some(password) = next_line(input).await? else {
            return Ok(None);
        };
        app.login.submit(&email, &password).await;
        if let Some(page) = app.view.take_navigation() {
            return Ok(Some(page));
        }
    }
}

async fn run_channels(app: &App, input: &mut Input) -> Result<Option<Page>> {
    let channels = ChannelListController::new(app.ctx.clone());
    if channels.init_sidebar().await.is_none() {
        return Ok(Some(app.view.take_navigation().unwrap_or(Page::Login)));
    }
    println!("<n> open channel, /new <name> create, empty line refresh, /logout");

    while let Some(line) = next_line(input).await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => {
                channels.load_channels().await;
            }
            "/new" => {
                channels.create_channel(rest).await;
            }
            "/logout" => app.login.logout().await,
            _ => match line.parse::<usize>() {
                Ok(index) if index > 0 && channels.select_row(index - 1) => {}
                _ => println!("unknown channel or command '{line}'"),
            },
        }
        if let Some(page) = app.view.take_navigation() {
            return Ok(Some(page));
        }
    }
    Ok(None)
}

/// A line typed on the chat page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatInput {
    Back,
    Logout,
    /// Zero-based sidebar row; sent as a message when no such row exists.
    SwitchTo(usize),
    Send,
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/back" => Self::Back,
            "/logout" => Self::Logout,
            other => match other.parse::<usize>() {
                Ok(index) if index > 0 => Self::SwitchTo(index - 1),
                _ => Self::Send,
            },
        }
    }
}

async fn run_chat(app: &App, input: &mut Input) -> Result<Option<Page>> {
    let sidebar = ChannelListController::new(app.ctx.clone());
    if sidebar.init_sidebar().await.is_none() {
        return Ok(Some(app.view.take_navigation().unwrap_or(Page::Login)));
    }
    let chat = ChatController::new(app.ctx.clone());
    let Some(mut session) = chat.enter().await else {
        return Ok(Some(app.view.take_navigation().unwrap_or(Page::Channels)));
    };
    println!("type a message and press Enter, <n> switch channel, /back for channels, /logout");

    loop {
        tokio::select! {
            line = next_line(input) => {
                let Some(line) = line? else {
                    return Ok(None);
                };
                match ChatInput::parse(&line) {
                    ChatInput::Back => return Ok(Some(Page::Channels)),
                    ChatInput::Logout => app.login.logout().await,
                    ChatInput::SwitchTo(row) if sidebar.select_row(row) => {}
                    ChatInput::SwitchTo(_) | ChatInput::Send => {
                        chat.handle_key(&session, "Enter", false, &line).await;
                    }
                }
            }
            Some(event) = session.next_event() => {
                chat.dispatch(session.channel_id, event);
            }
        }
        if let Some(page) = app.view.take_navigation() {
            return Ok(Some(page));
        }
    }
}
