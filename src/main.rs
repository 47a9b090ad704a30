use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trading_insights::advisor::{select_responder, DEFAULT_TOP_INSIGHTS, DEFAULT_TRADE_SAMPLE};
use trading_insights::analytics::AnalysisReport;
use trading_insights::config::{load_thresholds, thresholds_to_toml, ThresholdProfile};
use trading_insights::session::{InsightService, DEFAULT_FETCH_LIMIT};
use trading_insights::source::JsonFileSource;

#[derive(Parser)]
#[command(name = "trading-insights")]
#[command(version = "0.1.0")]
#[command(about = "Performance analytics and insights for a trading journal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Threshold overrides (TOML)
    #[arg(short, long, global = true)]
    thresholds: Option<PathBuf>,

    /// Threshold profile: standard, strict or lenient
    #[arg(short, long, global = true, default_value = "standard")]
    profile: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct JournalArgs {
    /// JSON export of the trade journal
    #[arg(long)]
    trades: PathBuf,

    /// User the trades belong to
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Strategy the trades belong to
    #[arg(short, long, default_value = "default")]
    strategy: String,

    /// Most recent trades to analyze
    #[arg(short, long, default_value_t = DEFAULT_FETCH_LIMIT)]
    limit: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics, health grades and ranked insights
    Analyze {
        #[command(flatten)]
        journal: JournalArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the plain-text context handed to the advisory chat
    Context {
        #[command(flatten)]
        journal: JournalArgs,

        #[arg(long, default_value_t = DEFAULT_TOP_INSIGHTS)]
        top: usize,

        #[arg(long, default_value_t = DEFAULT_TRADE_SAMPLE)]
        sample: usize,
    },
    /// Ask a question about the journal
    Ask {
        #[command(flatten)]
        journal: JournalArgs,

        #[arg(short, long)]
        question: String,
    },
    /// Print the effective thresholds as TOML
    Thresholds,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let profile = ThresholdProfile::parse(&cli.profile)
        .ok_or_else(|| anyhow!("Unknown profile '{}': use standard, strict or lenient", cli.profile))?;
    let thresholds = Arc::new(load_thresholds(profile, cli.thresholds.as_deref())?);
    info!("Using {} thresholds: {}", profile.name(), profile.description());

    match cli.command {
        Commands::Analyze { journal, json } => {
            let service = service_for(&journal, thresholds);
            let outcome = service.analyze(&journal.user, &journal.strategy).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            } else {
                print_report(&outcome.report);
            }
        }
        Commands::Context { journal, top, sample } => {
            let service = service_for(&journal, thresholds);
            let outcome = service.analyze(&journal.user, &journal.strategy).await?;
            println!("{}", outcome.context(top, sample).render());
        }
        Commands::Ask { journal, question } => {
            if question.trim().is_empty() {
                return Err(anyhow!("Question must not be empty"));
            }
            // No completion provider is wired into the CLI
            let responder = select_responder(None);
            let service = service_for(&journal, thresholds);
            let answer = service
                .ask(
                    &journal.user,
                    &journal.strategy,
                    &question,
                    responder.as_ref(),
                    DEFAULT_TOP_INSIGHTS,
                    DEFAULT_TRADE_SAMPLE,
                )
                .await?;
            println!("{}", answer);
        }
        Commands::Thresholds => {
            println!("{}", thresholds_to_toml(&thresholds)?);
        }
    }

    Ok(())
}

fn service_for(journal: &JournalArgs, thresholds: Arc<trading_insights::AnalyticsThresholds>) -> InsightService {
    let source = JsonFileSource::new(journal.trades.clone());
    InsightService::new(Arc::new(source), thresholds).with_fetch_limit(journal.limit)
}

fn print_report(report: &AnalysisReport) {
    let m = &report.metrics;
    if m.is_empty() {
        warn!("No valid trades found");
    }

    println!("\n=== Performance ===");
    println!("Total Trades:   {} ({} W / {} L / {} BE)", m.total_trades, m.winning_trades, m.losing_trades, m.breakeven_trades);
    println!("Win Rate:       {:.1}%", m.win_rate);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Avg R:R:        {:.2}", m.avg_risk_reward);
    println!("Net Profit:     {:.2}", m.net_profit);
    println!("Expectancy:     {:.2}", m.expectancy);
    println!("Max Drawdown:   {:.2}", m.max_drawdown);
    println!("Consistency:    {:.1}% ({}/{} months)", m.consistency, m.profitable_months, m.trading_months);

    let h = &report.health;
    println!("\n=== Health ===");
    if h.is_rated() {
        println!("Overall:        {:.1}/100", h.overall);
        println!("Performance:    {}", h.performance);
        println!("Risk:           {}", h.risk);
        println!("Psychology:     {} (discipline {})", h.psychology, h.discipline);
    } else {
        println!("Not enough trades to grade ({})", h.performance);
    }

    if let Some(prediction) = &report.prediction {
        println!("Outlook:        {} (score {}, {}% confidence)", prediction.outlook, prediction.score, prediction.confidence);
    }

    println!("\n=== Insights ===");
    if report.insights.is_empty() {
        println!("No insights yet");
    }
    for insight in &report.insights {
        println!(
            "[{:<6}] {:<8} {} ({}% confidence)",
            insight.priority.to_string(),
            insight.kind.to_string(),
            insight.title,
            insight.confidence
        );
        println!("         {}", insight.description);
        println!("         -> {}", insight.actionable);
    }
}
