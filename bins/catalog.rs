use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use service::coffees::dto::{CreateCoffeeDto, PaginationQueryDto, UpdateCoffeeDto};
use service::coffees::repo::seaorm::{coffees_service, SeaOrmCoffeesService};

#[derive(Parser, Debug)]
#[command(name = "catalog", version, about = "Maintain the coffee catalog from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List coffees with their flavours
    List {
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
    },
    /// Show one coffee
    Get { id: String },
    /// Create a coffee; repeat --flavour for each flavour name
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        brand: String,
        #[arg(long = "flavour")]
        flavours: Vec<String>,
    },
    /// Overwrite the given fields of a coffee
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long = "flavour")]
        flavours: Vec<String>,
        /// Replace the flavours with an empty set
        #[arg(long, conflicts_with = "flavours")]
        clear_flavours: bool,
    },
    /// Delete a coffee
    Remove { id: String },
    /// Recommend a coffee (counter + audit event)
    Recommend { id: String },
}

fn init_logging(cfg: Option<&configs::AppConfig>) {
    let json = cfg.map(|c| c.logging.is_json()).unwrap_or(false);
    common::utils::logging::init_logging(json);
    info!(service = "catalog", event = "logger_init", "tracing subscriber initialized");
}

async fn run(cli: Cli, cfg: configs::AppConfig) -> anyhow::Result<Value> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    let svc: SeaOrmCoffeesService = coffees_service(db);

    let out = match cli.command {
        Command::List { limit, offset } => {
            serde_json::to_value(svc.find_all(&PaginationQueryDto::new(limit, offset)).await?)?
        }
        Command::Get { id } => serde_json::to_value(svc.find_one(&id).await?)?,
        Command::Create { name, brand, flavours } => {
            serde_json::to_value(svc.create(CreateCoffeeDto { name, brand, flavours }).await?)?
        }
        Command::Update { id, name, brand, flavours, clear_flavours } => {
            let flavours = if clear_flavours || !flavours.is_empty() { Some(flavours) } else { None };
            serde_json::to_value(svc.update(&id, UpdateCoffeeDto { name, brand, flavours }).await?)?
        }
        Command::Remove { id } => serde_json::to_value(svc.remove(&id).await?)?,
        Command::Recommend { id } => {
            let coffee = svc.find_one(&id).await?;
            svc.recommend_coffee(&coffee).await?;
            serde_json::to_value(svc.find_one(&id).await?)?
        }
    };
    Ok(out)
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    // 提前加载 .env，使得 RUST_LOG、DATABASE_URL 等环境变量生效
    dotenv().ok();

    // 配置优先 config.toml，其次环境变量 DATABASE_URL
    let cfg = configs::AppConfig::load_or_env();
    init_logging(cfg.as_ref().ok());
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "catalog", event = "config_invalid", error = %e, "configuration rejected");
            return std::process::ExitCode::FAILURE;
        }
    };

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "catalog", event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "catalog", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "catalog", event = "start", %run_id, command = ?cli.command, "catalog command starting");
    match rt.block_on(run(cli, cfg)) {
        Ok(out) => {
            match serde_json::to_string_pretty(&out) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    error!(service = "catalog", event = "render_failed", error = %e, "cannot render output");
                    return std::process::ExitCode::FAILURE;
                }
            }
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "catalog", event = "command_failed", %run_id, error = %e, "catalog command failed");
            std::process::ExitCode::FAILURE
        }
    }
}
