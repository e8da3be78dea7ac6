use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

use sarfetch::agent::{self, Agent};
use sarfetch::api::{self, AppState};
use sarfetch::catalog::StacCatalog;
use sarfetch::config::CONFIG;
use sarfetch::data_models::SearchRequest;
use sarfetch::finder::SceneFinder;
use sarfetch::llm::{ChatMessage, OpenAi};

#[derive(Parser, Debug)]
#[command(author, version, about = "Natural-language Sentinel-1 GRD search & download")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat agent in the terminal
    Chat,
    /// Search and download directly, no LLM involved
    Fetch {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        /// Target date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Search +/- this many days around the date
        #[arg(long)]
        days: Option<u32>,
        /// Half-width of the bounding box in degrees
        #[arg(long)]
        deg: Option<f64>,
    },
    /// HTTP API plus the web UI from static/
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Fetch {
            lat,
            lon,
            date,
            days,
            deg,
        } => {
            let mut req = SearchRequest::new(lat, lon, date);
            if let Some(d) = days {
                req.day_window = d;
            }
            if let Some(d) = deg {
                req.deg_window = d;
            }
            match build_finder().find_and_download(&req).await {
                Ok(result) => println!("{}", agent::summarize(&result)),
                Err(e) => {
                    eprintln!("{}", agent::describe_error(&e));
                    std::process::exit(1);
                }
            }
        }
        Command::Chat => run_chat().await?,
        Command::Serve { port } => run_server(port).await?,
    }
    Ok(())
}

fn build_finder() -> SceneFinder {
    let catalog = StacCatalog::new(CONFIG.stac_url.clone());
    SceneFinder::new(catalog, CONFIG.save_dir.clone())
}

fn build_agent(finder: SceneFinder) -> Option<Agent> {
    let key = CONFIG.openai_api_key.as_ref()?;
    Some(Agent::new(
        OpenAi::new(key.clone(), CONFIG.openai_model.clone()),
        finder,
    ))
}

async fn run_chat() -> Result<()> {
    let Some(chat_agent) = build_agent(build_finder()) else {
        bail!("OPENAI_API_KEY is not set; the chat agent needs it (use `fetch` for direct downloads)");
    };

    println!(
        "Sentinel-1 agent ready. Describe a place and a date, e.g. \
         \"get me Sentinel-1 near Busan around 2023-06-01\". Ctrl-D to quit."
    );

    let mut history = vec![agent::system_message()];
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        history.push(ChatMessage::user(line));
        match chat_agent.respond(&mut history).await {
            Ok(reply) => {
                if let Some(summary) = &reply.tool_summary {
                    println!("{summary}\n");
                }
                println!("{}", reply.reply);
            }
            Err(e) => eprintln!("agent error: {e:#}"),
        }
    }
    Ok(())
}

async fn run_server(port: u16) -> Result<()> {
    let finder = build_finder();
    let chat_agent = build_agent(finder.clone());
    if chat_agent.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; /api/chat will return 503");
    }

    let state = Arc::new(AppState {
        finder,
        agent: chat_agent,
    });
    let router = api::create_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on http://{addr}, downloads go to {}", CONFIG.save_dir);
    axum::serve(listener, router).await?;
    Ok(())
}
