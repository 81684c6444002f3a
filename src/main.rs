use clap::Parser;
use personal_finance_api::app::{probe, JobDispatcher, Scheduler};
use personal_finance_api::config::cli::{Command, JobsCommand};
use personal_finance_api::utils::error::{ApiError, ErrorSeverity};
use personal_finance_api::utils::logger;
use personal_finance_api::{app, CliConfig, JobTable, Result, Settings};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if let Err(e) = run(cli).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_settings(cli: &CliConfig) -> Result<Settings> {
    Settings::load(cli.environment()?, cli.config.as_deref())
}

async fn run(cli: CliConfig) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Command::Serve {
        bind: None,
        with_scheduler: false,
    });

    // 服務模式的日誌格式取決於設定，其餘子命令用簡單的終端輸出
    let mut settings = if matches!(command, Command::Serve { .. }) {
        // 設定載入期間先用暫時的終端 subscriber，避免訊息在服務日誌初始化前遺失
        let loaded = tracing::subscriber::with_default(logger::cli_subscriber(cli.verbose), || {
            load_settings(&cli)
        });
        if loaded.is_err() {
            logger::init_cli_logger(cli.verbose);
        }
        loaded?
    } else {
        logger::init_cli_logger(cli.verbose);
        load_settings(&cli)?
    };

    match command {
        Command::Serve {
            bind,
            with_scheduler,
        } => {
            if let Some(bind) = bind {
                settings.server.bind_addr = bind;
            }
            if let Err(e) = logger::init_service_logger(&settings.logging, cli.verbose) {
                logger::init_cli_logger(cli.verbose);
                return Err(e);
            }
            serve(Arc::new(settings), with_scheduler).await
        }
        Command::Jobs { action } => jobs(&settings, action).await,
        Command::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Probe { url, timeout_secs } => {
            let health = probe::probe_health(&url, Duration::from_secs(timeout_secs)).await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
    }
}

async fn serve(settings: Arc<Settings>, with_scheduler: bool) -> Result<()> {
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

    let scheduler = if with_scheduler {
        let dispatcher =
            JobDispatcher::new(Arc::new(JobTable::standard()?), settings.tasks.clone());
        let mut stop_rx = stop_rx.clone();
        Some(tokio::spawn(async move {
            Scheduler::new(dispatcher)
                .run_until(async move {
                    let _ = stop_rx.wait_for(|stop| *stop).await;
                })
                .await
        }))
    } else {
        None
    };

    let shutdown = async move {
        app::shutdown_signal().await;
        let _ = stop_tx.send(true);
    };
    app::serve(settings, shutdown).await?;

    if let Some(handle) = scheduler {
        handle.await.map_err(|e| ApiError::JobFailed {
            job: "scheduler".to_string(),
            details: e.to_string(),
        })??;
    }
    Ok(())
}

async fn jobs(settings: &Settings, action: JobsCommand) -> Result<()> {
    let table = Arc::new(JobTable::standard()?);

    match action {
        JobsCommand::List => {
            let now = chrono::Utc::now();
            println!("{:<32} {:<14} {:<18} NEXT RUN (UTC)", "NAME", "CRON", "SCHEDULE");
            for job in table.declarations() {
                println!(
                    "{:<32} {:<14} {:<18} {}",
                    job.name,
                    job.trigger.to_string(),
                    job.trigger.describe(),
                    job.trigger.next_after(now).format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        JobsCommand::Run { name } => {
            let dispatcher = JobDispatcher::new(table, settings.tasks.clone());
            let run = dispatcher.dispatch(&name, chrono::Utc::now()).await?.wait().await?;
            println!("{}", serde_json::to_string_pretty(&run)?);

            if run.succeeded() {
                println!("✅ Job {} completed", run.job_name);
                Ok(())
            } else {
                Err(ApiError::JobFailed {
                    job: run.job_name,
                    details: run.message,
                })
            }
        }
    }
}
