//! Ticket submission client
//!
//! Submits one ticket to the helpdesk server and prints every update until the
//! ticket is resolved.
//!
//! Usage:
//!   helpdesk-submit --name Ana "urgente: servidor caído"
//!   helpdesk-submit --server 10.0.0.5:1900 --priority low --name Ana "consulta"

use anyhow::{Context, Result};
use clap::Parser;
use helpdesk_dispatch::TicketClient;
use helpdesk_shared::{ClientSubmission, Priority, Ticket};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "helpdesk-submit")]
#[command(about = "Submit a support ticket and follow it until it is resolved")]
struct Args {
    /// Ticket socket address of the server
    #[arg(long, default_value = "127.0.0.1:1900")]
    server: String,

    /// Your name, as shown to technicians
    #[arg(long)]
    name: String,

    /// Override the keyword-derived priority (high, medium, low)
    #[arg(long)]
    priority: Option<Priority>,

    /// Problem description
    #[arg(required = true)]
    description: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let description = args.description.join(" ");
    let priority = args
        .priority
        .unwrap_or_else(|| Priority::classify(&description));

    let mut client = TicketClient::connect(&args.server)
        .await
        .with_context(|| format!("Failed to connect to {}", args.server))?;

    let ticket = client
        .submit(&ClientSubmission {
            client_name: args.name,
            description,
            priority: Some(priority),
        })
        .await
        .context("Submission failed")?;
    print_ticket("Accepted", &ticket);

    let resolved = client
        .wait_resolved(|ticket| print_ticket("Updated", ticket))
        .await
        .context("Lost connection before the ticket was resolved")?;

    println!(
        "Ticket {} resolved by {}",
        resolved.id,
        resolved.assigned_technician.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

fn print_ticket(label: &str, ticket: &Ticket) {
    match &ticket.assigned_technician {
        Some(technician) => println!("{}: {} | {}", label, ticket, technician),
        None => println!("{}: {}", label, ticket),
    }
}
