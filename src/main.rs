use clap::Parser;
use listing_report::core::ConfigProvider;
use listing_report::utils::error::{ErrorSeverity, ReportError};
use listing_report::utils::{logger, validation::Validate};
use listing_report::{
    CliConfig, HttpFetcher, LocalStorage, ReportEngine, ReportPipeline, RunOutcome,
};

fn exit_code(e: &ReportError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn report_failure(e: &ReportError) {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting listing-report");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let output_dir = config.output_dir();
    tracing::info!("📁 Output folder: {}", output_dir.path().display());
    tracing::info!("🔎 Search URL: {}", config.search_url());

    // 建立抓取器、存儲和管道
    let fetcher = match HttpFetcher::from_config(&config.scrape_config()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            report_failure(&e);
            std::process::exit(exit_code(&e));
        }
    };
    let storage = LocalStorage::new(output_dir.path());
    let monitor = config.monitor;
    let pipeline = ReportPipeline::new(storage, config, fetcher);

    // 建立引擎並執行
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor);

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
            report_failure(&e);
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }
}
