use crate::domain::model::IngestReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::ResourceMonitor;

pub struct IngestEngine<P: Pipeline> {
    pipeline: P,
    monitor: ResourceMonitor,
}

impl<P: Pipeline> IngestEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ResourceMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<IngestReport> {
        let name = self.pipeline.name().to_string();
        tracing::info!("🚀 Starting {}", name);
        self.monitor.log_phase("start");

        // Extract
        tracing::info!("Extracting records...");
        let records = self.pipeline.extract().await?;
        let discovered = records.len();
        tracing::info!("Extracted {} records", discovered);
        self.monitor.log_phase("extract");

        // Transform
        tracing::info!("Checking catalog and staging products...");
        let staged = self.pipeline.transform(records).await?;
        let staged_count = staged.len();
        tracing::info!(
            "Staged {} of {} records ({} skipped)",
            staged_count,
            discovered,
            discovered.saturating_sub(staged_count)
        );
        self.monitor.log_phase("transform");

        // Load
        tracing::info!("Loading staged products...");
        let summary = self.pipeline.load(staged).await?;
        tracing::info!("Loaded {} products into {}", summary.loaded, summary.output);
        self.monitor.log_phase("load");
        self.monitor.log_final();

        Ok(IngestReport {
            pipeline: name,
            discovered,
            staged: staged_count,
            loaded: summary.loaded,
            output: summary.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LoadSummary;
    use crate::utils::error::IngestError;
    use async_trait::async_trait;

    struct CountingPipeline {
        records: Vec<u32>,
        fail_load: bool,
    }

    #[async_trait]
    impl Pipeline for CountingPipeline {
        type Record = u32;
        type Staged = u32;

        fn name(&self) -> &str {
            "counting"
        }

        async fn extract(&self) -> Result<Vec<u32>> {
            Ok(self.records.clone())
        }

        async fn transform(&self, records: Vec<u32>) -> Result<Vec<u32>> {
            // 奇數視為已存在於目錄中
            Ok(records.into_iter().filter(|r| r % 2 == 0).collect())
        }

        async fn load(&self, staged: Vec<u32>) -> Result<LoadSummary> {
            if self.fail_load {
                return Err(IngestError::processing("load failed"));
            }
            Ok(LoadSummary {
                loaded: staged.len(),
                output: "/tmp/work".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_run_reports_phase_counts() {
        let engine = IngestEngine::new(CountingPipeline {
            records: vec![1, 2, 3, 4, 6],
            fail_load: false,
        });

        let report = engine.run().await.unwrap();

        assert_eq!(report.pipeline, "counting");
        assert_eq!(report.discovered, 5);
        assert_eq!(report.staged, 3);
        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.output, "/tmp/work");
    }

    #[tokio::test]
    async fn test_run_with_monitoring_propagates_load_error() {
        let engine = IngestEngine::new_with_monitoring(
            CountingPipeline {
                records: vec![2],
                fail_load: true,
            },
            true,
        );

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, IngestError::ProcessingError { .. }));
    }

    #[test]
    fn test_empty_run() {
        let engine = IngestEngine::new(CountingPipeline {
            records: vec![],
            fail_load: false,
        });
        let report = tokio_test::block_on(engine.run());
        let report = tokio_test::assert_ok!(report);
        assert_eq!(report.loaded, 0);
    }
}
