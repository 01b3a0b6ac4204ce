#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = native::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::any::Any;
    use std::env;
    use std::fmt;
    use std::fs;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{anyhow, Context, Result};
    use glam::Vec2;
    use log::info;
    use pollster::block_on;
    use winit::dpi::LogicalSize;
    use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
    use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
    use winit::keyboard::{Key, NamedKey};
    use winit::window::{Window, WindowBuilder};

    use anaglyph_surface::assets::load_texture_in_background;
    use anaglyph_surface::controls::{
        CONVERGENCE_DISTANCE, EYE_SEPARATION, FOV, NEAR_CLIPPING_DISTANCE,
    };
    use anaglyph_surface::{
        Collaborators, ControlPanel, DemoApp, DemoConfig, NoWebcam, Renderer, SceneSummary,
        SceneToggles, TrackballRotator,
    };

    const ZOOM_FACTOR: f64 = 1.25;

    pub(crate) fn run() -> Result<()> {
        let options = CliOptions::parse()?;
        let mut config = match &options.config {
            Some(path) => {
                let xml = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                DemoConfig::from_xml(&xml)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => DemoConfig::default(),
        };
        if let Some(texture) = &options.texture {
            config.texture_path = texture.display().to_string();
        }

        if options.summary_only {
            return run_headless(&config);
        }

        match run_interactive(&config) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&config)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn run_headless(config: &DemoConfig) -> Result<()> {
        print!("{}", SceneSummary::from_config(config));
        Ok(())
    }

    fn run_interactive(config: &DemoConfig) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Anaglyph surface")
                .with_inner_size(LogicalSize::new(900.0, 900.0))
                .build(&event_loop)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let size = window.inner_size();
        let renderer = block_on(Renderer::new(
            Arc::clone(&window),
            size.width.max(1),
            size.height.max(1),
        ))
        .context("failed to initialize renderer")?;

        let controls = Arc::new(ControlPanel::new(&config.camera));
        let trackball = Arc::new(TrackballRotator::new(size.width, size.height, 0.0));
        let toggles = Arc::new(SceneToggles::new());
        let collaborators = Collaborators {
            controls: controls.clone(),
            view: trackball.clone(),
            toggles,
            webcam: Box::new(NoWebcam),
        };

        let mut demo = DemoApp::new(renderer, config, collaborators);
        demo.attach_texture(load_texture_in_background(PathBuf::from(&config.texture_path)));
        info!("controls: arrows adjust eye separation and convergence, PageUp/PageDown fov, Home/End near plane, +/- zoom, W wireframe");

        let mut app = AppState {
            window,
            demo,
            controls,
            trackball,
            cursor: Vec2::ZERO,
        };

        let mut last_error = None;
        event_loop
            .run(|event, target| {
                target.set_control_flow(ControlFlow::Poll);
                if let Err(err) = app.process_event(event, target) {
                    last_error = Some(err);
                    target.exit();
                }
            })
            .context("event loop terminated abnormally")?;

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    struct AppState {
        window: Arc<Window>,
        demo: DemoApp,
        controls: Arc<ControlPanel>,
        trackball: Arc<TrackballRotator>,
        cursor: Vec2,
    }

    impl AppState {
        fn process_event(
            &mut self,
            event: Event<()>,
            target: &EventLoopWindowTarget<()>,
        ) -> Result<()> {
            match event {
                Event::WindowEvent { event, window_id } if window_id == self.window.id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(size) => {
                            self.demo.renderer_mut().resize(size.width, size.height);
                            self.trackball.resize(size.width, size.height);
                        }
                        WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event, target),
                        WindowEvent::MouseInput {
                            state,
                            button: MouseButton::Left,
                            ..
                        } => match state {
                            ElementState::Pressed => self.trackball.begin_drag(self.cursor),
                            ElementState::Released => self.trackball.end_drag(),
                        },
                        WindowEvent::CursorMoved { position, .. } => {
                            self.cursor = Vec2::new(position.x as f32, position.y as f32);
                            self.trackball.drag_to(self.cursor);
                        }
                        WindowEvent::CursorLeft { .. } => self.trackball.end_drag(),
                        WindowEvent::RedrawRequested => self.redraw()?,
                        _ => {}
                    }
                }
                Event::AboutToWait => self.window.request_redraw(),
                _ => {}
            }
            Ok(())
        }

        fn redraw(&mut self) -> Result<()> {
            if let Err(err) = self.demo.render_frame() {
                match err {
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                        let size = self.window.inner_size();
                        self.demo.renderer_mut().resize(size.width, size.height);
                    }
                    wgpu::SurfaceError::OutOfMemory => {
                        return Err(anyhow!("GPU is out of memory"));
                    }
                    wgpu::SurfaceError::Timeout => {
                        info!("Surface timeout; retrying next frame");
                    }
                }
            }
            Ok(())
        }

        fn handle_keyboard(&mut self, event: &KeyEvent, target: &EventLoopWindowTarget<()>) {
            if event.state != ElementState::Pressed {
                return;
            }
            let nudge = match event.logical_key.as_ref() {
                Key::Named(NamedKey::Escape) => {
                    target.exit();
                    return;
                }
                Key::Named(NamedKey::ArrowRight) => Some((EYE_SEPARATION, 1.0)),
                Key::Named(NamedKey::ArrowLeft) => Some((EYE_SEPARATION, -1.0)),
                Key::Named(NamedKey::ArrowUp) => Some((CONVERGENCE_DISTANCE, 1.0)),
                Key::Named(NamedKey::ArrowDown) => Some((CONVERGENCE_DISTANCE, -1.0)),
                Key::Named(NamedKey::PageUp) => Some((FOV, 1.0)),
                Key::Named(NamedKey::PageDown) => Some((FOV, -1.0)),
                Key::Named(NamedKey::Home) => Some((NEAR_CLIPPING_DISTANCE, 1.0)),
                Key::Named(NamedKey::End) => Some((NEAR_CLIPPING_DISTANCE, -1.0)),
                Key::Character("+") | Key::Character("=") => {
                    let zoom = self.demo.zoom() / ZOOM_FACTOR;
                    self.demo.set_zoom(zoom);
                    None
                }
                Key::Character("-") => {
                    let zoom = self.demo.zoom() * ZOOM_FACTOR;
                    self.demo.set_zoom(zoom);
                    None
                }
                Key::Character("w") | Key::Character("W") => {
                    let scene = self.demo.scene_mut();
                    scene.draw_sphere_wireframe = !scene.draw_sphere_wireframe;
                    None
                }
                _ => None,
            };
            if let Some((id, steps)) = nudge {
                if let Some(value) = self.controls.nudge(id, steps) {
                    info!("{id} = {value:.2}");
                }
            }
        }
    }

    struct CliOptions {
        config: Option<PathBuf>,
        texture: Option<PathBuf>,
        summary_only: bool,
    }

    impl CliOptions {
        fn parse() -> Result<Self> {
            let mut args = env::args().skip(1);
            let mut options = Self {
                config: None,
                texture: None,
                summary_only: false,
            };
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--config" => {
                        let path = args.next().ok_or_else(|| anyhow!("--config expects a file"))?;
                        options.config = Some(PathBuf::from(path));
                    }
                    "--texture" => {
                        let path = args.next().ok_or_else(|| anyhow!("--texture expects a file"))?;
                        options.texture = Some(PathBuf::from(path));
                    }
                    "--summary-only" => options.summary_only = true,
                    other => {
                        return Err(anyhow!(
                            "Unknown argument: {other}. Usage: anaglyph-surface [--config <file.xml>] [--texture <png>] [--summary-only]"
                        ));
                    }
                }
            }
            Ok(options)
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
