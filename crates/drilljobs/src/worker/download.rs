use async_trait::async_trait;

use crate::error::WorkerError;
use crate::job::{Job, JobKind};
use crate::record::{JobReport, ReportOutcome};
use crate::remote::RemoteFailure;

use super::{unexpected_payload, JobContext, Worker, WorkerOutput, WorkerResult};

/// Reads log data page by page until the server reports no more rows.
///
/// Cancellation is checked before every page. Rows read so far are kept
/// in the attached report whatever way the download ends.
pub struct DownloadLogWorker;

enum Stop {
    Exhausted,
    Cancelled,
    PageLimit,
    Failed(RemoteFailure),
}

#[async_trait]
impl Worker for DownloadLogWorker {
    fn kind(&self) -> JobKind {
        JobKind::DownloadLog
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::DownloadLog(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let log = &payload.log;
        let limit = ctx.log_page_limit();

        let mut rows: Vec<String> = Vec::new();
        let mut pages = 0usize;
        let stop = loop {
            if ctx.is_cancelled() {
                break Stop::Cancelled;
            }
            if pages >= limit {
                break Stop::PageLimit;
            }
            match ctx.store().read_log_page(log, pages).await {
                Ok(page) => {
                    pages += 1;
                    rows.extend(page.rows);
                    if let Some(total) = page.total_pages.filter(|total| *total > 0) {
                        ctx.report_progress(pages as f64 / total as f64);
                    }
                    log::debug!("Read page {} of {} ({} rows so far)", pages, log, rows.len());
                    if !page.has_more {
                        break Stop::Exhausted;
                    }
                }
                Err(failure) => break Stop::Failed(failure),
            }
        };

        let mut report = JobReport::new(
            format!("Log data: {}", log.display_name()),
            format!("{} rows in {} pages", rows.len(), pages),
        );
        report.push_row("pages", ReportOutcome::Info, Some(pages.to_string()));
        report.push_row("rows", ReportOutcome::Info, Some(rows.len().to_string()));

        let result = match stop {
            Stop::Exhausted => {
                log::info!("Downloaded {} rows from {}", rows.len(), log);
                WorkerResult::success(format!("Downloaded {} rows from {}", rows.len(), log))
            }
            Stop::PageLimit => {
                log::warn!("Download of {} stopped at the {} page limit", log, limit);
                report.push_row(
                    "limit",
                    ReportOutcome::Info,
                    Some(format!("Stopped at the {} page limit", limit)),
                );
                WorkerResult::success(format!(
                    "Downloaded {} rows from {} (stopped at the {} page limit)",
                    rows.len(),
                    log,
                    limit
                ))
            }
            Stop::Cancelled => {
                log::info!("Download of {} cancelled after {} pages", log, pages);
                WorkerResult::incomplete(format!(
                    "Download of {} stopped after {} pages ({} rows)",
                    log,
                    pages,
                    rows.len()
                ))
            }
            Stop::Failed(failure) => {
                log::warn!("Failed to read page {} of {}: {}", pages, log, failure);
                report.push_row(
                    format!("page {}", pages),
                    ReportOutcome::Failed,
                    Some(failure.reason.clone()),
                );
                WorkerResult::failure(
                    format!("Failed to download data from {} after {} pages", log, pages),
                    failure.reason,
                )
            }
        };

        report.attachment = Some(rows.join("\n"));
        ctx.attach_report(report);

        Ok(WorkerOutput::new(result.with_affected(log.to_string())))
    }
}
