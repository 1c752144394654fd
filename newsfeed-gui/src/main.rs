mod app;

use std::sync::Arc;

use eframe::{egui, NativeOptions};
use newsfeed_core::{FeedStore, SourceConfig, SyntheticSource};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, NewsApp};

fn main() -> eframe::Result<()> {
    init_tracing();

    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    let config = SourceConfig::from_file(SourceConfig::default_path());
    info!(
        emit_interval_ms = config.emit_interval_ms,
        detail_delay_ms = config.detail_delay_ms,
        "starting news feed"
    );

    let store = Arc::new(FeedStore::with_detail_timeout(
        SyntheticSource::new(config),
        config.detail_timeout(),
    ));
    {
        let _guard = runtime.enter();
        store.start();
    }

    let init = AppInit {
        runtime: runtime.clone(),
        store: store.clone(),
    };

    let result = eframe::run_native(
        "Live News Feed",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([480.0, 760.0])
                .with_min_inner_size([360.0, 480.0]),
            ..Default::default()
        },
        Box::new(move |cc| Box::new(NewsApp::new(init, &cc.egui_ctx))),
    );

    if let Err(err) = runtime.block_on(store.shutdown()) {
        warn!(error = %err, "feed store did not shut down cleanly");
    }
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
