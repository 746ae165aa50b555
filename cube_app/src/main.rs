//! Rotating cube demo
//!
//! Opens a window and spins a textured cube until the window is closed or
//! Escape is pressed. An optional first argument names a `.toml` or `.ron`
//! configuration file.

use std::path::Path;

use cube_engine::foundation::logging;
use cube_engine::prelude::*;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["resources/config/cube.toml", "cube.toml"];

fn load_config() -> Result<CubeConfig, ConfigError> {
    if let Some(path) = std::env::args().nth(1) {
        log::info!("Loading configuration from {path}");
        return CubeConfig::load_from_file(&path);
    }

    match DEFAULT_CONFIG_PATHS.iter().find(|path| Path::new(path).exists()) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            CubeConfig::load_from_file(path)
        }
        None => {
            log::info!("No configuration file found, using defaults");
            Ok(CubeConfig::default())
        }
    }
}

struct CubeApp {
    window: Window,
    driver: FrameDriver<VulkanRenderer>,
    timer: Timer,
}

impl CubeApp {
    fn new(config: &CubeConfig) -> Result<Self, Box<dyn std::error::Error>> {
        log::info!("Creating window...");
        let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;

        log::info!("Creating Vulkan renderer...");
        let renderer = VulkanRenderer::new(&mut window, config)?;
        let driver = FrameDriver::new(renderer, CubeAnimation::from_config(&config.animation));

        Ok(Self {
            window,
            driver,
            timer: Timer::new(),
        })
    }

    fn run(&mut self) -> VulkanResult<()> {
        log::info!("Starting render loop");

        'running: while !self.window.should_close() {
            for event in self.window.poll_events() {
                match event {
                    WindowEvent::Resized(width, height) => self.driver.notify_resized(width, height),
                    WindowEvent::CloseRequested => break 'running,
                }
            }

            if self.driver.draw_frame(self.timer.elapsed_seconds())? == FrameStatus::Skipped {
                // Minimized: block until something happens instead of spinning
                self.window.wait_events();
            }
            self.timer.tick();
            log::trace!("Frame time {:.2} ms", self.timer.delta_time() * 1000.0);
        }

        self.driver.backend().wait_idle()?;

        let stats = self.driver.stats();
        log::info!(
            "Render loop finished: {} frames presented, {} skipped, {} swapchain rebuilds, {:.1} fps average",
            stats.frames_presented,
            stats.frames_skipped,
            stats.swapchain_rebuilds,
            self.timer.average_fps()
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(log::LevelFilter::Info);
    log::info!("Starting cube demo");

    let config = load_config()?;
    let mut app = CubeApp::new(&config)?;
    app.run()?;

    log::info!("Cube demo exited cleanly");
    Ok(())
}
