//! # Overlay window
//!
//! An eframe application that shows the active skin and keeps it in sync with
//! the bound controller. Everything the skin engine needs flows through here:
//!
//! - device snapshots come from the [`DeviceHandle`] watch channel and gate
//!   the compositor through the [`FramePump`]
//! - hot-plug events update the [`EngineContext`] binding and arm a
//!   [`Debouncer`] so a burst of reconnects rebuilds the skin once
//! - window sizes and remap choices are written back to the config file a
//!   moment after they stop changing
//!
//! Interaction is deliberately small: drop a skin file on the window to switch
//! skins, right-click for remaps and reload, left-click logs what lies under
//! the pointer.

pub mod egui_surface;

use crate::config::AppConfig;
use crate::context::EngineContext;
use crate::controller::{DeviceHandle, EdgeDetector, LoggingEdgeSink};
use crate::skin::Skin;
use crate::timing::{Debouncer, FramePump};
use eframe::egui::{self, Color32, Sense};
use kurbo::{Point, Size};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub use egui_surface::EguiSurface;

const SAVE_QUIET: Duration = Duration::from_secs(1);

pub struct OverlayApp {
    context: EngineContext,
    surface: EguiSurface,
    pump: FramePump,
    /// Coalesces hot-plug bursts into one skin rebuild
    rebuild: Debouncer,
    /// Coalesces resizes and remap changes into one config write
    save: Debouncer,
    edge: Option<EdgeDetector>,
    edge_sink: LoggingEdgeSink,
    device: DeviceHandle,
    config: AppConfig,
    config_path: Option<PathBuf>,
    background: Color32,
    viewport: (u32, u32),
    window_points: Option<(u32, u32)>,
    force_render: bool,
}

impl OverlayApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        config_path: Option<PathBuf>,
        device: DeviceHandle,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        let mut surface = EguiSurface::new(cc.egui_ctx.clone());
        let mut context = EngineContext::from_config(&config);
        if let Some(path) = &config.skin {
            if let Err(e) = context.activate_skin(path, &mut surface) {
                error!("Failed to load skin {}: {}", path.display(), e);
            }
        }
        if let Some(skin) = context.skin() {
            device.rebind(skin.device_name().map(str::to_owned));
        }

        Self {
            pump: FramePump::new(config.max_fps, config.forced_refresh()),
            rebuild: Debouncer::new(config.debounce()),
            save: Debouncer::new(SAVE_QUIET),
            edge: config.edge_signal_button.map(EdgeDetector::new),
            edge_sink: LoggingEdgeSink,
            background: config.background,
            context,
            surface,
            device,
            config,
            config_path,
            viewport: (0, 0),
            window_points: None,
            force_render: true,
        }
    }

    fn switch_skin(&mut self, ctx: &egui::Context, path: &Path) {
        if let Err(e) = self.context.activate_skin(path, &mut self.surface) {
            error!("Keeping current skin, {} failed to load: {}", path.display(), e);
            return;
        }
        if let Some(skin) = self.context.skin() {
            self.device.rebind(skin.device_name().map(str::to_owned));
        }
        if let Some((width, height)) = self.context.window_size() {
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
                width as f32,
                height as f32,
            )));
        }
        self.force_render = true;
        self.save.trigger(Instant::now());
    }

    fn handle_device_events(&mut self, now: Instant) {
        while let Some(event) = self.device.try_next_event() {
            debug!("Device event {:?} for {} at {}", event.kind, event.name, event.at);
            self.context.apply_device_event(&event);
            self.rebuild.trigger(now);
        }
        if self.rebuild.poll(now) {
            info!("Rebuilding skin after device changes");
            if let Err(e) = self.context.reload_active(&mut self.surface) {
                error!("Rebuild failed, keeping current skin: {}", e);
            }
            self.force_render = true;
        }
    }

    fn record_window_size(&mut self, ctx: &egui::Context, now: Instant) {
        let size = ctx.input(|i| i.screen_rect().size());
        let points = (size.x.round() as u32, size.y.round() as u32);
        if self.window_points == Some(points) {
            return;
        }
        if self.window_points.is_some() {
            self.context.record_window_size(points.0, points.1);
            self.save.trigger(now);
        }
        self.window_points = Some(points);
    }

    fn save_config(&mut self) {
        let Some(path) = &self.config_path else {
            return;
        };
        self.context.export_into(&mut self.config);
        if let Err(e) = self.config.save(path) {
            warn!("Could not save settings: {}", e);
        }
    }

    fn context_menu(&mut self, ui: &mut egui::Ui) {
        let names: Vec<String> = self
            .context
            .remaps()
            .iter()
            .map(|remap| remap.name.clone())
            .collect();
        for name in names {
            if ui.button(&name).clicked() {
                self.context.select_remap(&name);
                self.save.trigger(Instant::now());
                ui.close_menu();
            }
        }
        if ui.button("Original colors").clicked() {
            self.context.clear_remap();
            self.save.trigger(Instant::now());
            ui.close_menu();
        }
        ui.separator();
        if ui.button("Reload skin").clicked() {
            if let Err(e) = self.context.reload_active(&mut self.surface) {
                error!("Reload failed, keeping current skin: {}", e);
            }
            self.force_render = true;
            ui.close_menu();
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.handle_device_events(now);

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if let Some(path) = dropped.last() {
            self.switch_skin(ctx, path);
        }

        let state = self.device.latest();
        if let Some(edge) = &mut self.edge {
            edge.observe(state.as_ref(), &mut self.edge_sink);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(self.background))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.allocate_rect(rect, Sense::click());
                let pixels_per_point = ctx.pixels_per_point();
                let viewport = (
                    (rect.width() * pixels_per_point).round() as u32,
                    (rect.height() * pixels_per_point).round() as u32,
                );

                if let Some(skin) = self.context.skin_mut() {
                    let changed = skin.update_state(state);
                    let resized = viewport != self.viewport;
                    if self
                        .pump
                        .should_render(changed || resized || self.force_render, now)
                    {
                        self.surface.begin_frame();
                        skin.render(&mut self.surface, viewport.0, viewport.1);
                        self.pump.mark_rendered(now);
                        self.viewport = viewport;
                        self.force_render = false;
                    }

                    if response.clicked() {
                        if let Some(pos) = response.interact_pointer_pos() {
                            let local = (pos - rect.min) * pixels_per_point;
                            let hit = skin.elements_at(
                                Point::new(f64::from(local.x), f64::from(local.y)),
                                Size::new(f64::from(viewport.0), f64::from(viewport.1)),
                            );
                            info!(
                                "Under pointer: buttons {:?}, axes {:?}",
                                hit.buttons, hit.axes
                            );
                        }
                    }
                } else {
                    ui.centered_and_justified(|ui| {
                        ui.label("Drop a skin file here");
                    });
                }

                self.surface.paint(ui.painter(), rect.min, pixels_per_point);
                response.context_menu(|ui| self.context_menu(ui));
            });

        self.record_window_size(ctx, now);
        let closing = ctx.input(|i| i.viewport().close_requested());
        if self.save.poll(now) || (closing && self.save.flush()) {
            self.save_config();
        }

        ctx.request_repaint_after(self.pump.target_interval());
    }
}
