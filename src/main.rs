use clap::{Parser, Subcommand};
use colored::*;
use anyhow::Result;
use tracing::info;

mod app;
mod config;
mod error;
mod handler;
mod logging;
mod session;
mod tickets;
mod tui;
mod ui;

use app::App;
use config::Config;
use session::{Sender, Session};
use tickets::{display_field, TicketClient};

#[derive(Parser)]
#[command(name = "grievance")]
#[command(about = "Chat client that files grievances with the ticket service")]
struct Cli {
    /// Base URL of the ticket service (overrides config file and GRIEVANCE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// File a single grievance and print the bot's reply
    Send {
        /// Grievance text
        text: String,
    },
    /// List tickets recorded by the service
    Tickets,
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = &cli.api_url {
        config.set_base_url(url);
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(config).await,
        Commands::Send { text } => {
            logging::init_stderr();
            send_once(&config, &text).await
        }
        Commands::Tickets => {
            logging::init_stderr();
            list_tickets(&config).await
        }
        Commands::Config { save } => show_config(&config, save),
    }
}

async fn run_chat(config: Config) -> Result<()> {
    let log_path = logging::init_file()?;
    info!(endpoint = %config.tickets_url(), log = %log_path.display(), "starting chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(TicketClient::new(&config), events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    if app.in_flight > 0 {
        info!(pending = app.in_flight, "exiting with replies still pending");
    }
    result
}

async fn send_once(config: &Config, text: &str) -> Result<()> {
    let client = TicketClient::new(config);
    let mut session = Session::new();
    session.set_pending_input(text);

    let before = session.messages().len();
    session.submit(&client).await;

    if session.messages().len() == before {
        println!("{}", "Nothing to send: grievance text is empty.".yellow());
        return Ok(());
    }

    for msg in &session.messages()[before..] {
        match msg.sender {
            Sender::User => println!("{} {}", "You:".cyan().bold(), msg.text),
            Sender::Bot => println!("{} {}", "Bot:".yellow().bold(), msg.text),
        }
    }
    Ok(())
}

async fn list_tickets(config: &Config) -> Result<()> {
    let client = TicketClient::new(config);

    println!("\n{}", "Recorded Tickets".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    match client.list_tickets().await {
        Ok(tickets) if tickets.is_empty() => {
            println!("{}", "No tickets recorded yet.".yellow());
        }
        Ok(tickets) => {
            for ticket in tickets {
                println!(
                    "  #{} [{}] {} / {} ({})",
                    display_field(ticket.id.as_ref()).green(),
                    display_field(ticket.status.as_ref()),
                    display_field(ticket.assigned_team.as_ref()).bold(),
                    display_field(ticket.category.as_ref()),
                    display_field(ticket.created_at.as_ref()).dimmed(),
                );
                println!("      {}", display_field(ticket.grievance_text.as_ref()));
            }
        }
        Err(e) => {
            println!("{}: {}", "Error contacting ticket service".red(), e);
            println!("Endpoint: {}", client.url().bold());
        }
    }

    Ok(())
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    println!("{} {}", "base_url:".bold(), config.base_url);
    println!("{} {}", "tickets_path:".bold(), config.tickets_path);

    if save {
        let path = Config::config_path()?;
        config.save_to(&path)?;
        println!("{} {}", "Saved to".green(), path.display());
    }
    Ok(())
}
