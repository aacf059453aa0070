//! Main Vibe Sommelier application struct and eframe integration
//!
//! This module contains the SommelierApp that implements eframe::App. The
//! app never changes session data itself: it dispatches controller calls
//! onto the tokio runtime and renders whatever the latest snapshot says.

use crate::capture::CapturedImage;
use crate::platform::{
    playlist_search_url, ClipboardWriter, EguiClipboard, EguiLinkOpener, LinkOpener,
    RegistryStamp, ShareRequest, ShareSink, UnsupportedShare,
};
use crate::session::{SessionController, SessionSnapshot, SessionState};
use crate::testconfig::{AssertionContext, AssertionResult, TestCommand, TestConfig, TestRunner};
use crate::ui::components::{
    CameraAction, CopyFeedback, ErrorPanel, IdleAction, IdlePanel, LoadingPanel, ResultAction,
    ResultCard, Viewfinder,
};
use crate::ui::theme::Theme;
use egui::{CentralPanel, ColorImage, RichText, TextureHandle, TextureOptions, TopBottomPanel};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// How long an inline notice stays visible
const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Viewfinder refresh interval
const PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

/// Longest edge of the texture made from a captured image
const MAX_TEXTURE_EDGE: u32 = 1024;

#[derive(Clone, Debug)]
struct Notice {
    text: String,
    shown_at: Instant,
}

impl Notice {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown_at: Instant::now(),
        }
    }

    fn is_active(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < NOTICE_DURATION
    }
}

/// Main Vibe Sommelier application
pub struct SommelierApp {
    controller: SessionController,
    runtime: Handle,
    theme: Theme,
    initialized: bool,
    /// Scenario runner (if running a scripted scenario)
    test_runner: Option<TestRunner>,
    /// Exit code requested by the scenario
    pending_exit: Option<i32>,
    /// Contents of the archive path field
    archive_path: String,
    /// State seen on the previous frame
    last_state: SessionState,
    stamp: Option<RegistryStamp>,
    copy_feedback: Option<CopyFeedback>,
    /// Written from async tasks (file read failures) as well as the UI
    notice: Arc<Mutex<Option<Notice>>>,
    captured_texture: Option<(CapturedImage, Option<TextureHandle>)>,
    preview_texture: Option<TextureHandle>,
    preview_refreshed: Option<Instant>,
    clipboard: Box<dyn ClipboardWriter>,
    share: Box<dyn ShareSink>,
    links: Box<dyn LinkOpener>,
}

impl SommelierApp {
    /// Create the application from an eframe creation context
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        controller: SessionController,
        runtime: Handle,
        test_config: Option<TestConfig>,
    ) -> Self {
        Self::with_context(&cc.egui_ctx, controller, runtime, test_config)
    }

    /// Create the application for an existing egui context
    pub fn with_context(
        ctx: &egui::Context,
        controller: SessionController,
        runtime: Handle,
        test_config: Option<TestConfig>,
    ) -> Self {
        let theme = Theme::cellar();
        theme.apply(ctx);

        Self {
            controller,
            runtime,
            theme,
            initialized: false,
            test_runner: test_config.map(TestRunner::new),
            pending_exit: None,
            archive_path: String::new(),
            last_state: SessionState::Idle,
            stamp: None,
            copy_feedback: None,
            notice: Arc::new(Mutex::new(None)),
            captured_texture: None,
            preview_texture: None,
            preview_refreshed: None,
            clipboard: Box::new(EguiClipboard::new(ctx)),
            share: Box::new(UnsupportedShare),
            links: Box::new(EguiLinkOpener::new(ctx)),
        }
    }

    /// Replace the clipboard
    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardWriter>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Replace the share sink
    pub fn with_share_sink(mut self, share: Box<dyn ShareSink>) -> Self {
        self.share = share;
        self
    }

    /// Replace the link opener
    pub fn with_link_opener(mut self, links: Box<dyn LinkOpener>) -> Self {
        self.links = links;
        self
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Registry stamp of the result on screen, if any
    pub fn stamp(&self) -> Option<&RegistryStamp> {
        self.stamp.as_ref()
    }

    /// Text of the active notice, if any
    pub fn notice_text(&self) -> Option<String> {
        let now = Instant::now();
        self.notice
            .lock()
            .as_ref()
            .filter(|notice| notice.is_active(now))
            .map(|notice| notice.text.clone())
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        if let Some(ref mut runner) = self.test_runner {
            runner.start();
        }

        info!("[UI] Vibe Sommelier UI initialized");
    }

    // === Dispatch ===

    fn request_camera(&self, ctx: &egui::Context) {
        let controller = self.controller.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            controller.request_camera().await;
            ctx.request_repaint();
        });
    }

    fn capture(&self, ctx: &egui::Context) {
        let controller = self.controller.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            controller.capture().await;
            ctx.request_repaint();
        });
    }

    fn open_file(&self, ctx: &egui::Context, path: PathBuf) {
        let controller = self.controller.clone();
        let notice = self.notice.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    controller.select_file(bytes).await;
                }
                Err(e) => {
                    warn!("[UI] Could not read {}: {}", path.display(), e);
                    *notice.lock() = Some(Notice::new(format!(
                        "Could not open {}",
                        path.display()
                    )));
                }
            }
            ctx.request_repaint();
        });
    }

    fn select_bytes(&self, ctx: &egui::Context, bytes: Vec<u8>) {
        let controller = self.controller.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            controller.select_file(bytes).await;
            ctx.request_repaint();
        });
    }

    fn handle_dropped_files(&self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };

        if !self.controller.state().is_idle() {
            debug!("[UI] Ignoring dropped file outside Idle");
            return;
        }

        if let Some(bytes) = file.bytes {
            info!("[UI] Dropped {} ({} bytes)", file.name, bytes.len());
            self.select_bytes(ctx, bytes.to_vec());
        } else if let Some(path) = file.path {
            info!("[UI] Dropped {}", path.display());
            self.open_file(ctx, path);
        }
    }

    fn drain_events(&self) {
        while let Some(event) = self.controller.try_recv_event() {
            debug!("[UI] Session event: {:?}", event);
        }
    }

    /// Keep view-only data in step with the session
    fn sync_with_session(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.state == self.last_state {
            return;
        }
        debug!("[UI] View {} -> {}", self.last_state, snapshot.state);

        if self.last_state.is_camera_active() {
            self.preview_texture = None;
            self.preview_refreshed = None;
        }
        if self.last_state.is_result() {
            self.stamp = None;
            self.copy_feedback = None;
        }
        if snapshot.state.is_result() {
            self.stamp = Some(RegistryStamp::generate());
        }
        if snapshot.state.is_idle() {
            self.captured_texture = None;
        }

        self.last_state = snapshot.state;
    }

    // === Textures ===

    fn captured_texture(
        &mut self,
        ctx: &egui::Context,
        image: Option<&CapturedImage>,
    ) -> Option<TextureHandle> {
        let image = image?;
        if let Some((cached, texture)) = &self.captured_texture {
            if cached.same_payload(image) {
                return texture.clone();
            }
        }

        let texture = match image.decode() {
            Ok(decoded) => {
                let decoded = if decoded.width().max(decoded.height()) > MAX_TEXTURE_EDGE {
                    decoded.thumbnail(MAX_TEXTURE_EDGE, MAX_TEXTURE_EDGE)
                } else {
                    decoded
                };
                let rgba = decoded.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let color_image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                Some(ctx.load_texture("captured-image", color_image, TextureOptions::LINEAR))
            }
            Err(e) => {
                debug!("[UI] Captured image has no preview: {}", e);
                None
            }
        };

        self.captured_texture = Some((image.clone(), texture.clone()));
        texture
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let due = self
            .preview_refreshed
            .map(|at| now.saturating_duration_since(at) >= PREVIEW_INTERVAL)
            .unwrap_or(true);
        if !due {
            return;
        }
        self.preview_refreshed = Some(now);

        let Some(frame) = self.controller.preview_frame() else {
            return;
        };
        let size = [frame.width() as usize, frame.height() as usize];
        let color_image = ColorImage::from_rgb(size, frame.as_raw());

        match self.preview_texture.as_mut() {
            Some(texture) => texture.set(color_image, TextureOptions::LINEAR),
            None => {
                self.preview_texture =
                    Some(ctx.load_texture("viewfinder", color_image, TextureOptions::LINEAR));
            }
        }
    }

    // === Result actions ===

    fn handle_result_action(&mut self, action: ResultAction, snapshot: &SessionSnapshot) {
        let Some(result) = snapshot.analysis.as_ref() else {
            return;
        };

        match action {
            ResultAction::None => {}
            ResultAction::Close => self.controller.reset(),
            ResultAction::DiscoverPlaylist => match playlist_search_url(result) {
                Ok(url) => {
                    if let Err(e) = self.links.open(url.as_str()) {
                        warn!("[UI] Could not open playlist search: {}", e);
                    }
                }
                Err(e) => error!("[UI] Could not build playlist search: {}", e),
            },
            ResultAction::ShareNote => {
                let outcome = ShareRequest::for_result(result)
                    .and_then(|request| self.share.share(&request));
                if let Err(e) = outcome {
                    info!("[UI] Share unavailable: {}", e);
                    *self.notice.lock() = Some(Notice::new(e.user_message()));
                }
            }
            ResultAction::CopyColor(color) => match self.clipboard.write_text(&color) {
                Ok(()) => {
                    debug!("[UI] Copied {}", color);
                    self.copy_feedback = Some(CopyFeedback::new(color));
                }
                Err(e) => warn!("[UI] Could not copy {}: {}", color, e),
            },
        }
    }

    // === Scenario runner ===

    fn process_test_commands(&mut self, ctx: &egui::Context) {
        let mut pending_commands = Vec::new();
        if let Some(ref mut runner) = self.test_runner {
            while let Some(cmd) = runner.poll() {
                pending_commands.push(cmd);
            }
        }

        for (command, assertion) in pending_commands {
            match command {
                TestCommand::RequestCamera => {
                    info!("[TEST] Executing: RequestCamera");
                    self.request_camera(ctx);
                }
                TestCommand::Capture => {
                    info!("[TEST] Executing: Capture");
                    self.capture(ctx);
                }
                TestCommand::SelectFile { path } => {
                    info!("[TEST] Executing: SelectFile {}", path.display());
                    self.open_file(ctx, path);
                }
                TestCommand::Reset => {
                    info!("[TEST] Executing: Reset");
                    self.controller.reset();
                }
                TestCommand::Log { message } => {
                    info!("[TEST] Log: {}", message);
                }
                TestCommand::Exit { code } => {
                    info!("[TEST] Executing: Exit with code {}", code);
                    self.pending_exit = Some(code);
                }
            }

            if let Some(ref assertion) = assertion {
                let context = AssertionContext::from_snapshot(&self.controller.snapshot());
                if let Some(ref mut runner) = self.test_runner {
                    let result = runner.check_assertion(assertion, &context);
                    if matches!(result, AssertionResult::Failed(_)) && self.pending_exit == Some(0)
                    {
                        self.pending_exit = Some(1);
                    }
                }
            }
        }

        if let Some(ref runner) = self.test_runner {
            if runner.is_completed() {
                if let Some(code) = self.pending_exit.take() {
                    info!("{}", runner.summary());
                    let final_code = if runner.test_passed() { code } else { 1 };
                    info!("[TEST] Exiting with code {}", final_code);
                    self.controller.shutdown();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    std::process::exit(final_code);
                }
            }
        }
    }

    // === Rendering ===

    /// Render one frame; also used directly by UI tests
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.drain_events();

        let snapshot = self.controller.snapshot();
        self.sync_with_session(&snapshot);

        let now = Instant::now();
        if let Some(feedback) = &self.copy_feedback {
            if !feedback.is_active(now) {
                self.copy_feedback = None;
            }
        }
        let notice = self.notice_text();
        if notice.is_some() || self.copy_feedback.is_some() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        TopBottomPanel::top("header")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(self.theme.spacing_lg);
                    ui.label(
                        RichText::new("The Vibe Sommelier")
                            .size(44.0)
                            .color(self.theme.text_primary),
                    );
                    ui.label(self.theme.section_label("Curated Aesthetics & Sonic Notes"));
                    ui.add_space(self.theme.spacing);
                });
            });

        TopBottomPanel::bottom("footer")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(self.theme.spacing_sm);
                    ui.label(
                        RichText::new("Digital Aesthetics Bureau · No. 0422-90")
                            .size(10.0)
                            .color(self.theme.text_muted),
                    );
                    ui.add_space(self.theme.spacing_sm);
                });
            });

        let captured = self.captured_texture(ctx, snapshot.captured_image.as_ref());
        if snapshot.state.is_camera_active() {
            self.refresh_preview(ctx);
            ctx.request_repaint_after(PREVIEW_INTERVAL);
        }

        let mut result_action = ResultAction::None;
        let mut idle_action = IdleAction::None;
        let mut camera_action = CameraAction::None;
        let mut leave_error = false;

        CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(880.0);
                    self.theme.card_frame().show(ui, |ui| match snapshot.state {
                        SessionState::Idle => {
                            idle_action = IdlePanel::new(&mut self.archive_path, &self.theme).show(ui);
                            if let Some(text) = &notice {
                                ui.label(RichText::new(text).size(12.0).color(self.theme.error));
                            }
                        }
                        SessionState::CameraActive => {
                            camera_action = Viewfinder::new(self.preview_texture.as_ref(), &self.theme)
                                .device(snapshot.camera_label.as_deref())
                                .show(ui);
                        }
                        SessionState::Loading => {
                            LoadingPanel::new(&self.theme).show(ui);
                        }
                        SessionState::Result => {
                            if let Some(result) = snapshot.analysis.as_ref() {
                                let copied = self
                                    .copy_feedback
                                    .as_ref()
                                    .map(|feedback| feedback.color.as_str());
                                result_action = ResultCard::new(result, &self.theme)
                                    .image(captured.as_ref())
                                    .stamp(self.stamp.as_ref())
                                    .copied(copied)
                                    .notice(notice.as_deref())
                                    .show(ui);
                            }
                        }
                        SessionState::Error => {
                            let message = snapshot.error_message().unwrap_or_default();
                            leave_error = ErrorPanel::new(message, &self.theme).show(ui);
                        }
                    });
                });
            });
        });

        match idle_action {
            IdleAction::None => {}
            IdleAction::LiveView => self.request_camera(ctx),
            IdleAction::OpenFile(path) => self.open_file(ctx, path),
        }
        match camera_action {
            CameraAction::None => {}
            CameraAction::Capture => self.capture(ctx),
            CameraAction::Back => self.controller.reset(),
        }
        if leave_error {
            self.controller.reset();
        }
        if result_action != ResultAction::None {
            self.handle_result_action(result_action, &snapshot);
        }
    }
}

impl eframe::App for SommelierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.initialize();
        self.handle_dropped_files(ctx);
        self.process_test_commands(ctx);

        // Keep polling while a scenario runs or work is in flight
        if self.test_runner.is_some() || self.controller.state().is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        self.ui(ctx);
    }
}

impl Drop for SommelierApp {
    fn drop(&mut self) {
        self.controller.shutdown();
    }
}
