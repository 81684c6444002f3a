use clap::Parser;
use personal_finance_api::app::{serve_router, shutdown_signal};
use personal_finance_api::core::routes::not_found;
use personal_finance_api::utils::logger;
use personal_finance_api::HealthVariant;
use tower_http::trace::TraceLayer;

/// 只提供 `GET /health` 的最小服務，給負載平衡器在主服務就緒前使用
#[derive(Debug, Parser)]
#[command(name = "health-stub")]
#[command(about = "Minimal liveness endpoint")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: String,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let router = HealthVariant::Minimal
        .router::<()>()
        .fallback(|| async { not_found() })
        .layer(TraceLayer::new_for_http());

    tracing::info!("Starting health stub on {}", args.bind);
    serve_router(router, &args.bind, shutdown_signal()).await?;
    Ok(())
}
