//! Shared end-of-run reporting for the procedure binaries.

use crate::domain::model::IngestReport;
use crate::utils::error::{IngestError, Result};

/// Logs the failure with its recovery hint and returns the process exit code.
pub fn report_failure(e: &IngestError) -> i32 {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Ingest failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    e.exit_code()
}

pub fn report_outcome(outcome: Result<IngestReport>) -> i32 {
    match outcome {
        Ok(report) => {
            tracing::info!(
                "✅ {} completed: {} discovered, {} skipped, {} loaded",
                report.pipeline,
                report.discovered,
                report.skipped(),
                report.loaded
            );
            tracing::info!("📁 Output: {}", report.output);
            0
        }
        Err(e) => report_failure(&e),
    }
}
