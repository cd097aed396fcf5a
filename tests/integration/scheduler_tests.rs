use super::*;
use pricewatch::BatchRunner;
use pricewatch::scheduler::{BatchScheduler, JobStatus, TickOutcome};
use std::sync::Arc;

#[tokio::test]
async fn test_scheduled_tick_runs_full_batch() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page("p1", &product_page("$49")).await;
    env.accept_messages(1).await;

    let config = env.config();
    let csv = watchlist_csv(&[format!("{},50,{}", env.url("p1"), CONTACT)]);
    let runner = Arc::new(BatchRunner::from_config(&config, false).await?);
    let scheduler = BatchScheduler::new(runner, csv.path().to_path_buf(), &config.scheduler).await?;

    let outcome = scheduler.run_now().await;
    assert!(matches!(outcome, TickOutcome::Completed(ref report) if report.summary.count("notified") == 1));

    // Same crossing on the next tick: no second message
    let outcome = scheduler.run_now().await;
    assert!(matches!(outcome, TickOutcome::Completed(ref report) if report.summary.count("already_notified") == 1));

    let job = scheduler.job_info().await;
    assert_eq!(job.run_count, 2);
    assert_eq!(job.success_count, 2);
    assert_eq!(job.error_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_watchlist_is_reread_each_tick() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    env.serve_page("p1", &product_page("$49")).await;
    env.serve_page("p2", &product_page("$99")).await;
    env.accept_messages(0).await;

    let config = env.config();
    let csv = watchlist_csv(&[format!("{},10,{}", env.url("p1"), CONTACT)]);
    let runner = Arc::new(BatchRunner::from_config(&config, true).await?);
    let scheduler = BatchScheduler::new(runner, csv.path().to_path_buf(), &config.scheduler).await?;

    assert!(matches!(scheduler.run_now().await, TickOutcome::Completed(ref r) if r.summary.total == 1));

    std::fs::write(
        csv.path(),
        format!(
            "product_url,target_price,phone_number\n{},10,{}\n{},10,{}\n",
            env.url("p1"),
            CONTACT,
            env.url("p2"),
            CONTACT
        ),
    )?;
    assert!(matches!(scheduler.run_now().await, TickOutcome::Completed(ref r) if r.summary.total == 2));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scheduler_lifecycle() -> anyhow::Result<()> {
    let env = TestEnv::start().await;
    let config = env.config();
    let csv = watchlist_csv(&[]);
    let runner = Arc::new(BatchRunner::from_config(&config, true).await?);
    let mut scheduler = BatchScheduler::new(runner, csv.path().to_path_buf(), &config.scheduler).await?;

    scheduler.start(&config.scheduler.default_interval).await?;
    assert_eq!(scheduler.job_info().await.status, JobStatus::Active);
    println!("✓ Batch scheduled");

    scheduler.shutdown().await?;
    assert_eq!(scheduler.job_info().await.status, JobStatus::Stopped);

    Ok(())
}
