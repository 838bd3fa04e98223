use anyhow::Context;
use clap::Parser;
use listing_report::config::toml_config::TomlConfig;
use listing_report::core::ConfigProvider;
use listing_report::utils::{logger, validation::Validate};
use listing_report::{HttpFetcher, LocalStorage, ReportEngine, ReportPipeline, RunOutcome};

#[derive(Parser)]
#[command(name = "toml-report")]
#[command(about = "Listing report driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "report.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Model to search instead of the one in the config file
    #[arg(long)]
    model: Option<String>,

    /// Output folder, overriding the config file and the model-derived default
    #[arg(long)]
    output_dir: Option<String>,

    /// Dry run - show what would be scraped without sending any request
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based listing report");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    // 套用命令列覆寫
    let output_dir = config.apply_overrides(args.model.as_deref(), args.output_dir.as_deref());
    if output_dir.is_overridden() {
        tracing::info!("📁 Output folder (chosen): {}", output_dir.path().display());
    } else {
        tracing::info!("📁 Output folder (from model): {}", output_dir.path().display());
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No request will be sent");
        perform_dry_run(&config);
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立抓取器、存儲和管道
    let fetcher = HttpFetcher::from_config(&config.scrape_config())?;
    let storage = LocalStorage::new(output_dir.path());
    let pipeline = ReportPipeline::new(storage, config, fetcher);

    // 建立引擎並執行
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(RunOutcome::Written { files, records }) => {
            println!("✅ {} listings collected", records);
            for file in files {
                println!("📄 {}", file);
            }
        }
        Ok(RunOutcome::NothingFound) => {
            println!("⚠️ No listings found for the given search, nothing was written");
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("💡 {}", e.recovery_suggestion());
            return Err(anyhow::Error::new(e).context("Listing report failed"));
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    let scrape = config.scrape_config();
    let output = config.output_settings();

    println!("📋 Configuration Summary:");
    println!(
        "  Search: {} {}",
        config.search.brand, config.search.model
    );
    println!("  URL: {}", scrape.search_url);
    println!("  Max Pages: {}", scrape.max_pages);
    println!("  Delay: {:?}", scrape.delay);
    println!("  Detail Year Check: {}", scrape.verify_detail_year);
    println!("  Output: {}", output.dir.display());
    println!("  Formats: {}", output.formats.join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    let scrape = config.scrape_config();
    let output = config.output_settings();

    println!("🔍 Dry Run Analysis:");
    println!();

    // 頁面分析
    println!("📡 Pages:");
    println!("  First page: {}", scrape.search_url);
    if scrape.max_pages > 1 {
        println!(
            "  Then up to: {}",
            scrape
                .catalog
                .page_url(&scrape.search_url, scrape.max_pages)
        );
    }
    println!("  Headers: {}", scrape.headers.len());

    // 目錄結構分析
    println!();
    println!("🧩 Catalog Profile:");
    println!("  Fragment selectors: {}", scrape.catalog.fragment_selectors.join(" | "));
    println!("  Detail selectors: {}", scrape.catalog.detail_selectors.join(" | "));
    println!("  Listing markers: {}", scrape.catalog.listing_markers.join(", "));

    // 年份詞彙分析
    println!();
    println!("📅 Year Terms:");
    println!("  Labels: {}", scrape.year_terms.labels.join(", "));
    println!("  Negatives: {}", scrape.year_terms.negatives.join(", "));

    // 輸出分析
    println!();
    println!("💾 Output Files:");
    for (format, name) in [
        ("csv", &output.csv_filename),
        ("json", &output.json_filename),
        ("html", &output.html_filename),
    ] {
        if output.wants(format) {
            println!("  {}", output.dir.join(name).display());
        }
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
