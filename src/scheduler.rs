use crate::state::StateManager;
use anyhow::{bail, Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Start a scheduler taking one backup at each `HH:MM` (UTC) time.
/// Returns `None` when no times are configured.
pub async fn start_backup_scheduler(manager: StateManager, times: &[String]) -> Result<Option<JobScheduler>> {
    if times.is_empty() {
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;

    for time in times {
        let cron_expr = time_to_cron(time)?;
        info!("Scheduling backup for {} UTC (cron: {})", time, cron_expr);

        let manager = manager.clone();
        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let manager = manager.clone();
            Box::pin(async move {
                info!("Scheduled backup triggered");
                match manager.create_backup().await {
                    Ok(id) => info!("Scheduled backup {} written", id),
                    Err(e) => error!("Scheduled backup failed: {}", e),
                }
            })
        })
        .with_context(|| format!("Invalid backup schedule entry {time}"))?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("Backup scheduler started with {} jobs", times.len());

    Ok(Some(scheduler))
}

/// `HH:MM` (UTC) to a daily cron expression with a seconds field.
fn time_to_cron(time: &str) -> Result<String> {
    let Some((hour, minute)) = time.trim().split_once(':') else {
        bail!("Invalid time format: {}. Expected HH:MM", time);
    };

    let hour: u8 = hour.parse().with_context(|| format!("Invalid hour in {time}"))?;
    let minute: u8 = minute
        .parse()
        .with_context(|| format!("Invalid minute in {time}"))?;
    if hour > 23 || minute > 59 {
        bail!("Time out of range: {}", time);
    }

    Ok(format!("0 {} {} * * *", minute, hour))
}
