// src/main.rs

mod cli;

use clap::Parser;
use permitflow_lib::context::{resolve_app_data_dir, AppCtx, WizardConfig};
use permitflow_lib::error::{AppError, UserMsgKind};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::Args;

fn init_tracing(debug: bool) {
    // --debug > PERMITFLOW_LOG > default "warn"
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PERMITFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

fn run(args: Args) -> Result<(), AppError> {
    let app_data_dir = resolve_app_data_dir(args.data_dir.clone())?;
    std::fs::create_dir_all(&app_data_dir)?;

    let mut cfg = WizardConfig::from_env()?;
    if let Some(r) = args.role.as_deref() {
        cfg.role = permitflow_lib::types::Role::parse(r)
            .ok_or_else(|| AppError::UnknownRole(r.to_string()))?;
    }

    let state = permitflow_lib::init_state(&app_data_dir, cfg.role).map_err(AppError::Msg)?;
    let state = Arc::new(state);

    let mut ctx = AppCtx::new(app_data_dir);
    ctx.debug |= args.debug;

    tracing::debug!(
        data_dir = %ctx.app_data_dir.display(),
        role = %cfg.role,
        "permitflow starting"
    );

    cli::dispatch(args.command, state, &ctx, cfg)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let debug = args.debug
        || std::env::var(permitflow_lib::context::ENV_DEBUG)
            .map(|v| v == "1")
            .unwrap_or(false);
    init_tracing(debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let m = e.user_msg();
            let tag = match m.kind {
                UserMsgKind::Warn => "warning",
                UserMsgKind::Info => "note",
                _ => "error",
            };
            eprintln!("{tag}: {}", m.short);
            if let Some(d) = m.detail {
                eprintln!("  {d}");
            }
            ExitCode::FAILURE
        }
    }
}
