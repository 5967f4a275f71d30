// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Darkroom server entrypoint.

use std::error::Error;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use darkroom::config::{parse_options, Config, DEFAULT_BIND};

const DEFAULT_LOG_FILTER: &str = "darkroom=info,tower_http=info";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--bind <addr>] [--data-dir <dir>] [--uploads-dir <dir>] [--frontend-dir <dir>] [--public-origin <url>] [--durable-writes]\n\n--bind defaults to {DEFAULT_BIND} (env DARKROOM_BIND).\n--data-dir holds gallery ledgers and bookings (env DARKROOM_DATA_DIR, default ./data).\n--uploads-dir holds uploaded photos (env DARKROOM_UPLOADS_DIR, default <data-dir>/uploads).\n--frontend-dir serves static pages such as gallery.html for unmatched paths (env DARKROOM_FRONTEND_DIR).\n--public-origin fixes the scheme and host used in generated links instead of request headers.\n\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "darkroom".to_owned());

    let options = match parse_options(args) {
        Ok(options) => options,
        Err(()) => {
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let config = Config::from_env(options)?;
    init_tracing(config.log_json);

    let app = darkroom::http::router(config.app_state());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir.display(),
        uploads_dir = %config.uploads_dir.display(),
        "darkroom listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
