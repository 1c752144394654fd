use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use eframe::egui::{self, Color32};
use newsfeed_core::{Category, FeedError, FeedObserver, FeedState, FeedStatus, FeedStore, NewsItem};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, warn};

fn color_for_category(label: &str) -> Color32 {
    match Category::from_label(label) {
        Some(Category::Technology) => Color32::from_rgb(0, 122, 204),
        Some(Category::Sports) => Color32::from_rgb(76, 175, 80),
        Some(Category::Politics) => Color32::from_rgb(244, 67, 54),
        Some(Category::Entertainment) => Color32::from_rgb(156, 39, 176),
        None => Color32::from_rgb(158, 158, 158),
    }
}

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub store: Arc<FeedStore>,
}

struct DetailOutcome {
    id: u64,
    result: Result<(), FeedError>,
}

pub struct NewsApp {
    runtime: Arc<Runtime>,
    store: Arc<FeedStore>,
    observer: FeedObserver,
    outcome_tx: mpsc::Sender<DetailOutcome>,
    outcomes: mpsc::Receiver<DetailOutcome>,
    // Requests in flight; the store itself only knows idle or loaded.
    loading: HashSet<u64>,
    failures: HashMap<u64, String>,
}

impl NewsApp {
    pub fn new(init: AppInit, ctx: &egui::Context) -> Self {
        let observer = init.store.observe();
        let (outcome_tx, outcomes) = mpsc::channel(64);

        // Repaint whenever the store publishes, even without user input.
        let mut watcher = observer.clone();
        let repaint_ctx = ctx.clone();
        init.runtime.spawn(async move {
            while watcher.changed().await.is_ok() {
                repaint_ctx.request_repaint();
            }
            debug!("feed observer closed");
        });

        Self {
            runtime: init.runtime,
            store: init.store,
            observer,
            outcome_tx,
            outcomes,
            loading: HashSet::new(),
            failures: HashMap::new(),
        }
    }

    fn refresh_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.loading.remove(&outcome.id);
            match outcome.result {
                Ok(()) => {
                    self.failures.remove(&outcome.id);
                }
                Err(FeedError::Stopped) => {}
                Err(err) => {
                    self.failures.insert(outcome.id, err.to_string());
                }
            }
        }
    }

    fn request_detail(&mut self, id: u64, ctx: &egui::Context) {
        if self.loading.contains(&id) {
            return;
        }
        let _guard = self.runtime.enter();
        match self.store.request_detail(id) {
            Ok(request) => {
                self.loading.insert(id);
                self.failures.remove(&id);
                let tx = self.outcome_tx.clone();
                let ctx = ctx.clone();
                self.runtime.spawn(async move {
                    let result = request.outcome().await;
                    if tx.send(DetailOutcome { id, result }).await.is_err() {
                        debug!(id, "detail outcome dropped, window closed");
                    }
                    ctx.request_repaint();
                });
            }
            Err(err) => {
                warn!(id, error = %err, "detail request rejected");
                self.failures.insert(id, err.to_string());
            }
        }
    }

    fn draw_header(&self, ui: &mut egui::Ui, state: &FeedState) {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("📰 Live News").size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let (status_text, status_color) = match state.status {
                    FeedStatus::Live => ("● live", Color32::from_rgb(76, 175, 80)),
                    FeedStatus::Idle => ("○ waiting", Color32::from_rgb(150, 150, 150)),
                    FeedStatus::Exhausted => ("■ ended", Color32::from_rgb(255, 152, 0)),
                    FeedStatus::Stopped => ("■ stopped", Color32::from_rgb(244, 67, 54)),
                };
                ui.label(egui::RichText::new(status_text).color(status_color).size(13.0));
                ui.separator();
                ui.label(egui::RichText::new(format!("{} items", state.items.len())).size(13.0));
                ui.separator();
                ui.label(
                    egui::RichText::new(format!("📖 Read: {}", state.read_count))
                        .strong()
                        .size(13.0),
                );
            });
        });
    }

    /// Returns the ids the user asked to load during this frame.
    fn draw_items(&self, ui: &mut egui::Ui, state: &FeedState) -> Vec<u64> {
        let mut clicked = Vec::new();

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if state.items.is_empty() {
                    ui.vertical_centered(|ui| {
                        ui.add_space(50.0);
                        ui.label(egui::RichText::new("📭 Waiting for news…").size(16.0));
                    });
                    return;
                }

                ui.add_space(4.0);
                for item in &state.items {
                    if self.draw_card(ui, item) {
                        clicked.push(item.id);
                    }
                    ui.add_space(5.0);
                }
            });

        clicked
    }

    fn draw_card(&self, ui: &mut egui::Ui, item: &NewsItem) -> bool {
        let loading = self.loading.contains(&item.id);
        let card = egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical(|ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!("🏷 {}", item.category))
                            .color(color_for_category(&item.category))
                            .size(12.0),
                    );
                    ui.separator();
                    ui.label(
                        egui::RichText::new(item.received_at.format("%H:%M:%S").to_string())
                            .weak()
                            .size(12.0),
                    );
                });
                ui.add(
                    egui::Label::new(egui::RichText::new(&item.title).strong().size(17.0))
                        .wrap(true),
                );
                ui.label(egui::RichText::new(&item.summary).weak().size(13.0));
                ui.add_space(3.0);

                if item.is_detail_loaded {
                    ui.separator();
                    ui.label(egui::RichText::new(&item.detail_content).size(14.0));
                } else if loading {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.label(egui::RichText::new("Loading details…").weak().size(12.0));
                    });
                } else if let Some(reason) = self.failures.get(&item.id) {
                    ui.label(
                        egui::RichText::new(format!("⚠ {reason}. Tap to retry"))
                            .color(Color32::from_rgb(244, 67, 54))
                            .size(12.0),
                    );
                } else {
                    ui.label(
                        egui::RichText::new("• Tap to read more")
                            .color(Color32::from_rgb(0, 122, 204))
                            .size(12.0),
                    );
                }
            });
        });

        if item.is_detail_loaded || loading {
            return false;
        }
        let response = ui.interact(
            card.response.rect,
            ui.id().with(("news-card", item.id)),
            egui::Sense::click(),
        );
        response.on_hover_cursor(egui::CursorIcon::PointingHand).clicked()
    }
}

impl eframe::App for NewsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_outcomes();
        let state = self.observer.current();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.draw_header(ui, &state);
        });

        let clicked = egui::CentralPanel::default()
            .show(ctx, |ui| self.draw_items(ui, &state))
            .inner;

        for id in clicked {
            self.request_detail(id, ctx);
        }
    }
}
