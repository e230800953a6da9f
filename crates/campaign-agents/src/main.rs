//! `campaign-agents` CLI.
//!
//! Each subcommand runs one stage and writes its JSON result to `--out` (or
//! stdout), so stages can be chained through files:
//!
//! ```bash
//! campaign-agents analyze --image lamp.png --name Lumina --out director.json
//! campaign-agents plan --director director.json --route 0 --out plan.json
//! campaign-agents market --director director.json --route 0 --image lamp.png --out market.json
//! campaign-agents strategy --director director.json --route 0 --market market.json --out strategy.json
//! campaign-agents image --plan plan.json --item img_1_white --reference lamp.png --out img_1_white.png
//! campaign-agents report market --market market.json --name Lumina
//! ```
//!
//! On failure the user-facing message goes to stderr and the technical detail
//! to the log (`RUST_LOG=debug` for raw payloads).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use campaign_agents::report;
use campaign_agents::stages::image_manifest;
use campaign_agents::{CampaignStudio, ImageAspect, StudioConfig, API_KEY_STORE_KEY};
use clap::{Parser, Subcommand};
use orchestration::{
    encode_file, parse_data_uri, ClassifiedError, ContentPlan, ContentStrategy, DirectorOutput, Language,
    MarketAnalysis, MarketingRoute, ResultCache,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "campaign-agents")]
#[command(about = "Product marketing campaign generator", version)]
struct Cli {
    /// Path to a TOML config file (environment variables still override it)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output language: zh-TW or en (overrides config)
    #[arg(long, global = true)]
    language: Option<Language>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a product photo and propose marketing routes
    Analyze {
        /// Product photo (JPG, PNG or WebP, max 10 MB)
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "")]
        name: String,
        /// Brand background, inline
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate the content plan for one route
    Plan {
        /// Output of `analyze`
        #[arg(long)]
        director: PathBuf,
        /// Route index (0-based)
        #[arg(long, default_value_t = 0)]
        route: usize,
        /// File with reference copy or competitor notes
        #[arg(long)]
        reference_copy: Option<PathBuf>,
        #[arg(long, default_value = "")]
        context: String,
        /// Product photo, attached as visual reference
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate the market analysis for one route
    Market {
        #[arg(long)]
        director: PathBuf,
        #[arg(long, default_value_t = 0)]
        route: usize,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate the content strategy from a market analysis
    Strategy {
        #[arg(long)]
        director: PathBuf,
        #[arg(long, default_value_t = 0)]
        route: usize,
        /// Output of `market`
        #[arg(long)]
        market: PathBuf,
        /// Output of `plan`, to reference generated images by file name
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Ids of plan items whose images exist (comma-separated)
        #[arg(long, value_delimiter = ',')]
        generated: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate one marketing image
    Image {
        /// Prompt text; alternatively use --plan with --item
        #[arg(long, conflicts_with = "plan")]
        prompt: Option<String>,
        #[arg(long, requires = "item")]
        plan: Option<PathBuf>,
        /// Plan item id whose visual prompt and ratio are used
        #[arg(long)]
        item: Option<String>,
        /// Reference product photo
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Aspect ratio (1:1, 9:16, 16:9, 3:4, 4:3); defaults to the plan item's ratio or 3:4
        #[arg(long)]
        aspect: Option<ImageAspect>,
        /// Image file to write (decoded), or a .txt file for the data URI
        #[arg(long)]
        out: PathBuf,
    },

    /// Render a plain-text report
    Report {
        #[command(subcommand)]
        kind: ReportCommands,
    },

    /// Manage the saved API key
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Inspect or clear the result cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommands {
    /// Product analysis, selected route and concept prompts
    Strategy {
        #[arg(long)]
        director: PathBuf,
        #[arg(long, default_value_t = 0)]
        route: usize,
    },
    /// Analysis, route and the full content plan
    Plan {
        #[arg(long)]
        director: PathBuf,
        #[arg(long, default_value_t = 0)]
        route: usize,
        #[arg(long)]
        plan: PathBuf,
    },
    /// Market analysis
    Market {
        #[arg(long)]
        market: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Content strategy
    Content {
        #[arg(long)]
        strategy: PathBuf,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyCommands {
    /// Validate and save an API key
    Set { key: String },
    /// Remove the saved API key
    Clear,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Entry count and total payload size
    Stats,
    /// Remove expired and unreadable entries
    Purge,
    /// Remove every cache entry
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ClassifiedError>() {
                Some(classified) => {
                    error!(
                        kind = %classified.kind(),
                        status = ?classified.http_status(),
                        violations = classified.violations().len(),
                        technical = %classified.technical_message(),
                        "stage failed"
                    );
                    eprintln!("{}", classified.user_message());
                }
                None => {
                    error!(error = %format!("{err:#}"), "command failed");
                    eprintln!("error: {err:#}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = StudioConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(language) = cli.language {
        config.language = language;
    }

    match cli.command {
        Commands::Analyze {
            image,
            name,
            context,
            out,
        } => {
            let studio = CampaignStudio::connect(config)?;
            let product_image = encode_file(&image)
                .await
                .with_context(|| format!("failed to load {}", image.display()))?;
            let output = studio.analyze_product(&product_image, &name, &context).await?;
            write_json(out.as_deref(), &output)
        }

        Commands::Plan {
            director,
            route,
            reference_copy,
            context,
            image,
            out,
        } => {
            let studio = CampaignStudio::connect(config)?;
            let director: DirectorOutput = read_json(&director)?;
            let selected = select_route(&director, route)?;
            let reference_copy = match reference_copy {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => String::new(),
            };
            let product_image = match image {
                Some(path) => Some(encode_file(&path).await.with_context(|| format!("failed to load {}", path.display()))?),
                None => None,
            };
            let plan = studio
                .generate_content_plan(
                    selected,
                    &director.product_analysis,
                    &reference_copy,
                    &context,
                    product_image.as_deref(),
                )
                .await?;
            write_json(out.as_deref(), &plan)
        }

        Commands::Market {
            director,
            route,
            image,
            out,
        } => {
            let studio = CampaignStudio::connect(config)?;
            let director: DirectorOutput = read_json(&director)?;
            let selected = select_route(&director, route)?;
            let product_image = encode_file(&image)
                .await
                .with_context(|| format!("failed to load {}", image.display()))?;
            let analysis = studio
                .generate_market_analysis(&director.product_analysis.name, selected, &product_image)
                .await?;
            write_json(out.as_deref(), &analysis)
        }

        Commands::Strategy {
            director,
            route,
            market,
            plan,
            generated,
            out,
        } => {
            let studio = CampaignStudio::connect(config)?;
            let director: DirectorOutput = read_json(&director)?;
            let selected = select_route(&director, route)?;
            let analysis: MarketAnalysis = read_json(&market)?;
            let images = match plan {
                Some(path) => {
                    let plan: ContentPlan = read_json(&path)?;
                    let generated: HashSet<String> = generated.into_iter().collect();
                    image_manifest(&plan, &generated)
                }
                None => Vec::new(),
            };
            let strategy = studio
                .generate_content_strategy(&analysis, &director.product_analysis.name, selected, &images)
                .await?;
            write_json(out.as_deref(), &strategy)
        }

        Commands::Image {
            prompt,
            plan,
            item,
            reference,
            aspect,
            out,
        } => {
            let (prompt, plan_aspect) = match (prompt, plan, item) {
                (Some(prompt), _, _) => (prompt, None),
                (None, Some(path), Some(id)) => {
                    let plan: ContentPlan = read_json(&path)?;
                    let item = plan
                        .items
                        .into_iter()
                        .find(|item| item.id == id)
                        .with_context(|| format!("no item '{id}' in {}", path.display()))?;
                    (item.visual_prompt_en, Some(ImageAspect::from(item.ratio)))
                }
                _ => bail!("either --prompt or --plan with --item is required"),
            };
            let aspect = aspect.or(plan_aspect).unwrap_or_default();

            let studio = CampaignStudio::connect(config)?;
            let reference = match reference {
                Some(path) => Some(encode_file(&path).await.with_context(|| format!("failed to load {}", path.display()))?),
                None => None,
            };
            let image = studio
                .generate_marketing_image(&prompt, reference.as_deref(), aspect)
                .await?;
            write_image(&out, &image)
        }

        Commands::Report { kind } => {
            let today = chrono::Local::now().date_naive();
            let text = match kind {
                ReportCommands::Strategy { director, route } => {
                    let director: DirectorOutput = read_json(&director)?;
                    let selected = select_route(&director, route)?;
                    report::strategy_report(&director.product_analysis, selected, today)
                }
                ReportCommands::Plan {
                    director,
                    route,
                    plan,
                } => {
                    let director: DirectorOutput = read_json(&director)?;
                    let selected = select_route(&director, route)?;
                    let plan: ContentPlan = read_json(&plan)?;
                    report::content_plan_report(&director.product_analysis, selected, &plan.items, today)
                }
                ReportCommands::Market { market, name } => {
                    report::market_report(&read_json::<MarketAnalysis>(&market)?, &name, today)
                }
                ReportCommands::Content { strategy, name } => {
                    report::content_strategy_report(&read_json::<ContentStrategy>(&strategy)?, &name, today)
                }
            };
            print!("{text}");
            Ok(())
        }

        Commands::Key { action } => {
            let store = config.open_store().context("failed to open key-value store")?;
            match action {
                KeyCommands::Set { key } => {
                    campaign_agents::input::validate_api_key(&key, config.language)?;
                    store.set(API_KEY_STORE_KEY, key.trim())?;
                    info!("API key saved");
                }
                KeyCommands::Clear => {
                    store.remove(API_KEY_STORE_KEY)?;
                    info!("API key removed");
                }
            }
            Ok(())
        }

        Commands::Cache { action } => {
            let store = config.open_store().context("failed to open key-value store")?;
            let cache = ResultCache::new(store).with_retention(config.retention()?);
            match action {
                CacheCommands::Stats => {
                    let stats = cache.stats()?;
                    println!("entries: {}\nbytes: {}", stats.count, stats.total_bytes);
                }
                CacheCommands::Purge => {
                    let removed = cache.purge_expired(chrono::Utc::now())?;
                    println!("removed {removed} entries");
                }
                CacheCommands::Clear => {
                    let removed = cache.clear_all()?;
                    println!("removed {removed} entries");
                }
            }
            Ok(())
        }
    }
}

fn select_route(director: &DirectorOutput, index: usize) -> Result<&MarketingRoute> {
    director.marketing_routes.get(index).with_context(|| {
        format!(
            "route {index} out of range ({} routes available)",
            director.marketing_routes.len()
        )
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(out: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Decode into `out`, or keep the data URI when `out` is a `.txt` file.
fn write_image(out: &Path, data_uri: &str) -> Result<()> {
    let keep_uri = out.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    let bytes = if keep_uri {
        data_uri.as_bytes().to_vec()
    } else {
        let inline = parse_data_uri(data_uri).context("service returned an unreadable image")?;
        base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .context("image payload is not valid base64")?
    };
    std::fs::write(out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
    info!(path = %out.display(), "image written");
    Ok(())
}
