mod cli;

use clap::Parser;
use cli::Args;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use padskin::config::AppConfig;
use padskin::context::EngineContext;
use padskin::controller::{CollectorSettings, DeviceHandle, EdgeDetector, LoggingEdgeSink};
use padskin::skin::{PixmapSurface, Skin};
use padskin::timing::{Debouncer, FramePump};
use padskin::ui::OverlayApp;
use std::path::Path;
use std::time::Instant;
use tiny_skia::Color;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => AppConfig::default_path()
            .map_err(|e| warn!("Settings will not be saved: {}", e))
            .ok(),
    };
    let mut config = match &config_path {
        Some(path) => AppConfig::load(path).map_err(|e| eyre!("{}", e))?,
        None => AppConfig::default(),
    };
    if let Some(skin) = args.skin {
        config.skin = Some(skin);
    }
    if let Some(max_fps) = args.max_fps {
        config.max_fps = max_fps;
    }

    if let Some(output) = &args.dump_frame {
        return dump_frame(&config, output);
    }

    let settings = CollectorSettings {
        deadzone: config.deadzone,
        ..CollectorSettings::default()
    };
    let device = match DeviceHandle::spawn(settings).await {
        Ok(device) => device,
        Err(e) => {
            warn!("No gamepad input, running in preview mode: {}", e);
            DeviceHandle::detached()
        }
    };

    if args.headless {
        return run_headless(config, device).await;
    }

    info!("Starting overlay window");
    let mut native_options = eframe::NativeOptions::default();
    let mut viewport = egui::ViewportBuilder::default().with_title("padskin");
    if let Some(size) = initial_window_size(&config) {
        viewport = viewport.with_inner_size(size);
    }
    native_options.viewport = viewport;

    eframe::run_native(
        "padskin",
        native_options,
        Box::new(|cc| Ok(Box::new(OverlayApp::new(cc, config, config_path, device)))),
    )
    .map_err(|e| eyre!("Overlay window failed: {}", e))?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn background(config: &AppConfig) -> Color {
    let [r, g, b, a] = config.background.to_srgba_unmultiplied();
    Color::from_rgba8(r, g, b, a)
}

fn initial_window_size(config: &AppConfig) -> Option<[f32; 2]> {
    let skin = config.skin.as_ref()?;
    let size = config.window_sizes.get(&skin.display().to_string())?;
    Some([size.width as f32, size.height as f32])
}

fn load_context(config: &AppConfig, surface: &mut PixmapSurface) -> Result<EngineContext> {
    let path = config
        .skin
        .as_ref()
        .ok_or_else(|| eyre!("No skin given; pass --skin or set `skin` in the config"))?;
    let mut context = EngineContext::from_config(config);
    context
        .activate_skin(path, surface)
        .map_err(|e| eyre!("Failed to load skin {}: {}", path.display(), e))?;
    Ok(context)
}

/// Renders one idle frame at the skin's window size
fn dump_frame(config: &AppConfig, output: &Path) -> Result<()> {
    let mut surface = PixmapSurface::new(background(config));
    let mut context = load_context(config, &mut surface)?;
    let (width, height) = context
        .window_size()
        .ok_or_else(|| eyre!("No active skin"))?;
    let skin = context
        .skin_mut()
        .ok_or_else(|| eyre!("No active skin"))?;

    if !surface.begin_frame(width, height) {
        return Err(eyre!("Skin has an empty size ({}x{})", width, height));
    }
    skin.render_state(&mut surface, None, width, height);
    surface
        .save_png(output)
        .map_err(|e| eyre!("Failed to write {}: {}", output.display(), e))?;
    info!("Wrote {}x{} frame to {}", width, height, output.display());
    Ok(())
}

/// Offscreen render loop, mostly useful to exercise a skin against a live pad
async fn run_headless(config: AppConfig, mut device: DeviceHandle) -> Result<()> {
    let mut surface = PixmapSurface::new(background(&config));
    let mut context = load_context(&config, &mut surface)?;
    if let Some(skin) = context.skin() {
        device.rebind(skin.device_name().map(str::to_owned));
    }
    let (width, height) = context
        .window_size()
        .ok_or_else(|| eyre!("No active skin"))?;

    let mut pump = FramePump::new(config.max_fps, config.forced_refresh());
    let mut rebuild = Debouncer::new(config.debounce());
    let mut edge = config.edge_signal_button.map(EdgeDetector::new);
    let mut sink = LoggingEdgeSink;
    info!("Running headless at {}x{}, Ctrl-C to stop", width, height);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        let started = Instant::now();
        while let Some(event) = device.try_next_event() {
            context.apply_device_event(&event);
            rebuild.trigger(started);
        }
        if rebuild.poll(started) {
            if let Err(e) = context.reload_active(&mut surface) {
                error!("Rebuild failed, keeping current skin: {}", e);
            }
        }

        let state = device.latest();
        if let Some(edge) = &mut edge {
            edge.observe(state.as_ref(), &mut sink);
        }
        if let Some(skin) = context.skin_mut() {
            let changed = skin.update_state(state);
            if pump.should_render(changed, started) {
                surface.begin_frame(width, height);
                skin.render(&mut surface, width, height);
                pump.mark_rendered(started);
            }
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(pump.sleep_for(started.elapsed())) => {}
        }
    }

    info!("Stopping after {} fps in the last second", pump.fps());
    Ok(())
}
