use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hrdesk_lib::config::AppConfig;
use hrdesk_lib::error::AppError;
use hrdesk_lib::orchestration::Orchestrator;

const DEMO_QUERIES: [&str; 4] = [
    "What are the recent announcements?",
    "Who works in the Engineering department?",
    "What's the leave policy for sick leave?",
    "Search for employees named John",
];

#[derive(Parser, Debug)]
#[command(name = "hrdesk")]
#[command(
    author,
    version,
    about = "HR assistant backed by employee, announcement and policy tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides HRDESK_BIND)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Chat with the assistant in the terminal
    Chat,
    /// Recreate the employee database with demo records
    Seed,
    /// Run the demo queries and exit
    Demo,
}

#[tokio::main]
async fn main() {
    // Load .env file (ok to fail if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hrdesk=debug,hrdesk_lib=debug")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    match command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            hrdesk_lib::serve(&config, &bind).await
        }
        Command::Seed => {
            let inserted = hrdesk_lib::seed_database(&config).await?;
            println!("Seeded {inserted} employees into {}", config.database_url);
            Ok(())
        }
        Command::Demo => {
            let mut orchestrator = hrdesk_lib::init_orchestrator(&config).await?;
            run_demo(&mut orchestrator).await;
            Ok(())
        }
        Command::Chat => {
            let mut orchestrator = hrdesk_lib::init_orchestrator(&config).await?;
            chat(&mut orchestrator).await
        }
    }
}

async fn run_demo(orchestrator: &mut Orchestrator) {
    let rule = "=".repeat(60);
    for (i, query) in DEMO_QUERIES.iter().enumerate() {
        println!("\n{rule}\nQuery {}/{}: {query}\n{rule}", i + 1, DEMO_QUERIES.len());
        match orchestrator.process_turn(query).await {
            Ok(reply) => println!("\nResponse:\n{reply}\n"),
            Err(e) => println!("Error processing query: {e}"),
        }
    }
}

async fn chat(orchestrator: &mut Orchestrator) -> Result<(), AppError> {
    println!("HR assistant ready. Type 'reset' to clear the conversation, 'quit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "reset" => {
                orchestrator.reset_session();
                println!("Conversation history cleared");
                continue;
            }
            _ => {}
        }

        match orchestrator.process_turn(input).await {
            Ok(reply) => println!("\nAssistant: {reply}"),
            Err(e) => println!("\nError: {e}"),
        }
    }

    println!("Goodbye!");
    Ok(())
}
