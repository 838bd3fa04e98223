use crate::core::{Pipeline, RunOutcome};
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("🚀 Starting listing report run");
        self.monitor.log_phase("Start");

        // Extract
        tracing::info!("📥 Collecting listings...");
        let raw = self.pipeline.extract().await?;
        tracing::info!("Collected {} raw listings", raw.len());
        self.monitor.log_phase("Extract");

        // Transform
        let data = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Kept {} listings across {} model years",
            data.dataset.len(),
            data.yearly_stats.len()
        );
        self.monitor.log_phase("Transform");

        // Load
        let outcome = self.pipeline.load(data).await?;
        match &outcome {
            RunOutcome::Written { files, records } => {
                tracing::info!("💾 Wrote {} listings to {} files", records, files.len());
            }
            RunOutcome::NothingFound => tracing::warn!("No listings found, nothing written"),
        }
        self.monitor.log_phase("Load");
        self.monitor.log_final();

        Ok(outcome)
    }
}
