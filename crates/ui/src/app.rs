use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use eframe::egui;
use ember_core::canvas::Viewport;
use ember_core::interaction::{SessionEvent, TooltipState};
use ember_core::model::FlamegraphView;
use ember_core::provider::{StackProvider, TreeProvider};
use ember_core::tooltip::TooltipAction;
use ember_core::{FlamegraphConfig, FlamegraphWidget, WidgetOutput};
use ember_protocol::{CursorIcon, Point, ThemeToken};

use crate::renderer;
use crate::theme::{self, ThemeMode};

/// Main application state.
pub struct EmberApp {
    provider: Option<StackProvider>,
    widget: FlamegraphWidget,
    /// Name of the loaded file.
    source: Option<String>,
    /// Contents of the filter box.
    filter_text: String,
    theme_mode: ThemeMode,
    /// Content height reported by the last painted frame.
    content_height: f32,
    error: Option<String>,
    /// Profile bytes delivered by an async load.
    pending_data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl EmberApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let theme_mode = ThemeMode::Dark;
        cc.egui_ctx.set_visuals(theme_mode.visuals());

        let pending_data: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));

        // On WASM, `#demo` in the URL loads the bundled stacks.
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(w) = web_sys::window() {
                let hash = w.location().hash().unwrap_or_default();
                if hash == "#demo" {
                    let pd = pending_data.clone();
                    let ctx = cc.egui_ctx.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        match Self::fetch_bytes("/assets/demo.folded").await {
                            Ok(bytes) => {
                                if let Ok(mut lock) = pd.lock() {
                                    *lock = Some(bytes);
                                }
                                ctx.request_repaint();
                            }
                            Err(e) => {
                                web_sys::console::error_1(&format!("ember: fetch error: {e}").into());
                            }
                        }
                    });
                }
            }
        }

        Self {
            provider: None,
            widget: FlamegraphWidget::new(FlamegraphConfig::default(), Vec::new()),
            source: None,
            filter_text: String::new(),
            theme_mode,
            content_height: 0.0,
            error: None,
            pending_data,
        }
    }

    fn load_bytes(&mut self, name: &str, data: &[u8]) -> anyhow::Result<()> {
        let provider = StackProvider::from_collapsed(data)
            .with_context(|| format!("failed to load {name}"))?;
        tracing::info!(name, bytes = data.len(), "loaded folded stacks");
        self.widget = FlamegraphWidget::new(*self.widget.config(), provider.metrics());
        self.provider = Some(provider);
        self.source = Some(name.to_string());
        self.filter_text.clear();
        Ok(())
    }

    fn load(&mut self, name: &str, data: &[u8]) {
        self.error = self.load_bytes(name, data).err().map(|e| format!("{e:#}"));
    }

    fn on_output(&mut self, output: Option<WidgetOutput>) {
        if let Some(WidgetOutput::StateChanged(state)) = output {
            match state.to_json() {
                Ok(json) => tracing::debug!(state = %json, "flamegraph state"),
                Err(e) => tracing::warn!(error = %e, "state not serializable"),
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let window = web_sys::window().ok_or("no window")?;
        let resp_value = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| format!("{e:?}"))?;
        let resp: web_sys::Response = resp_value.dyn_into().map_err(|_| "not a Response")?;
        if !resp.ok() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let buf = JsFuture::from(resp.array_buffer().map_err(|e| format!("{e:?}"))?)
            .await
            .map_err(|e| format!("{e:?}"))?;
        Ok(js_sys::Uint8Array::new(&buf).to_vec())
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("ember");
            ui.separator();

            if ui.button("Open").clicked() {
                #[cfg(not(target_arch = "wasm32"))]
                {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Folded stacks", &["folded", "collapsed", "txt"])
                        .pick_file()
                    {
                        let name = path.display().to_string();
                        match std::fs::read(&path) {
                            Ok(data) => self.load(&name, &data),
                            Err(e) => self.error = Some(format!("Failed to read file: {e}")),
                        }
                    }
                }
            }
            ui.separator();

            let selected = self.widget.state().selected_metric_name.clone();
            let mut choice = None;
            egui::ComboBox::from_id_salt("metric")
                .selected_text(if selected.is_empty() { "metric" } else { selected.as_str() })
                .show_ui(ui, |ui| {
                    for metric in self.widget.metrics() {
                        if ui.selectable_label(metric.name == selected, metric.name.as_str()).clicked() {
                            choice = Some(metric.name.clone());
                        }
                    }
                });
            if let Some(name) = choice {
                let output = self.widget.select_metric(&name);
                self.on_output(output);
            }

            let view = self.widget.state().view.clone();
            for (label, target) in [
                ("Top Down", FlamegraphView::TopDown),
                ("Bottom Up", FlamegraphView::BottomUp),
            ] {
                if ui.selectable_label(view == target, label).clicked() {
                    let output = self.widget.select_view(target);
                    self.on_output(output);
                }
            }
            ui.separator();

            let response = ui.add(
                egui::TextEdit::singleline(&mut self.filter_text)
                    .hint_text("Filter, e.g. HF: malloc")
                    .desired_width(220.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                let text = std::mem::take(&mut self.filter_text);
                let output = self.widget.add_filter_text(&text);
                self.on_output(output);
                response.request_focus();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let theme_label = match self.theme_mode {
                    ThemeMode::Dark => "Light",
                    ThemeMode::Light => "Dark",
                };
                if ui.button(theme_label).clicked() {
                    self.theme_mode = self.theme_mode.toggled();
                    ui.ctx().set_visuals(self.theme_mode.visuals());
                }
            });
        });

        let tags = self.widget.state().tags();
        if !tags.is_empty() {
            let mut removed = None;
            ui.horizontal_wrapped(|ui| {
                let fill = theme::resolve(ThemeToken::TagBackground, self.theme_mode);
                let text = theme::resolve(ThemeToken::TagText, self.theme_mode);
                for (i, tag) in tags.iter().enumerate() {
                    let button = egui::Button::new(egui::RichText::new(format!("{tag}  ✕")).color(text)).fill(fill);
                    if ui.add(button).clicked() {
                        removed = Some(i);
                    }
                }
            });
            if let Some(i) = removed {
                let output = self.widget.remove_tag(i);
                self.on_output(output);
            }
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_viewport(ui, |ui, visible| {
                let width = ui.available_width();
                let height = self.content_height.max(visible.height());
                let (rect, response) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::click());
                let to_content = |pos: egui::Pos2| Point::new(f64::from(pos.x - rect.min.x), f64::from(pos.y - rect.min.y));

                match response.hover_pos() {
                    Some(pos) => {
                        self.widget.handle(SessionEvent::PointerMoved(to_content(pos)));
                    }
                    None if self.widget.session().pointer.is_some() => {
                        self.widget.handle(SessionEvent::PointerLeft);
                    }
                    None => {}
                }
                if let Some(pos) = response.interact_pointer_pos() {
                    if response.clicked() {
                        let output = self.widget.handle(SessionEvent::Clicked(to_content(pos)));
                        self.on_output(output);
                    }
                    if response.double_clicked() {
                        let output = self.widget.handle(SessionEvent::DoubleClicked(to_content(pos)));
                        self.on_output(output);
                    }
                }

                let viewport = Viewport {
                    width: f64::from(width),
                    height: f64::from(visible.height()),
                    scroll_top: f64::from(visible.top()),
                };
                let frame = self.widget.paint(&viewport);
                self.content_height = frame.content_height as f32;

                let mut painter = ui.painter_at(rect);
                painter.rect_filled(rect, egui::CornerRadius::ZERO, theme::resolve(ThemeToken::Background, self.theme_mode));
                renderer::render_commands(&mut painter, &frame.commands, rect.min, self.theme_mode);

                if frame.cursor == CursorIcon::Pointer {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }

                self.tooltip_panel(ui.ctx(), rect.min);
            });
    }

    fn tooltip_panel(&mut self, ctx: &egui::Context, origin: egui::Pos2) {
        let Some((tooltip, content)) = self.widget.tooltip() else {
            return;
        };
        let anchor = origin + egui::vec2(tooltip.anchor.x as f32 + 12.0, tooltip.anchor.y as f32 + 12.0);
        let mut chosen = None;
        egui::Area::new(egui::Id::new("ember_tooltip"))
            .fixed_pos(anchor)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.strong(content.title.as_str());
                    for line in &content.lines {
                        ui.label(line);
                    }
                    for (key, value) in &content.properties {
                        ui.label(format!("{key}: {value}"));
                    }
                    if tooltip.state == TooltipState::Click && !content.actions.is_empty() {
                        ui.separator();
                        ui.horizontal_wrapped(|ui| {
                            for action in &content.actions {
                                if ui.button(action.label()).clicked() {
                                    chosen = Some(*action);
                                }
                            }
                        });
                    }
                });
            });
        if let Some(action) = chosen {
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: TooltipAction) {
        let output = self.widget.handle(SessionEvent::Action(action));
        self.on_output(output);
    }
}

impl eframe::App for EmberApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let pending = {
            let mut lock = self.pending_data.lock().unwrap_or_else(|e| e.into_inner());
            lock.take()
        };
        if let Some(data) = pending {
            self.load("demo", &data);
        }

        if let Some(provider) = &self.provider {
            self.widget.refresh(provider);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::RED, err);
                } else if let (Some(source), Some(data)) = (&self.source, self.widget.data()) {
                    let unit = self.widget.unit();
                    ui.label(format!(
                        "{source} | total: {} | nodes: {}",
                        unit.format_value(data.all_roots_cumulative_value),
                        data.nodes.len(),
                    ));
                } else {
                    ui.label("No stacks loaded. Click Open or drag & drop a folded stack file");
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.provider.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Drop a folded stack file here or click Open");
                });
                return;
            }
            self.canvas(ui);
        });

        // File drop
        let dropped = ctx.input(|i| {
            i.raw.dropped_files.first().and_then(|file| {
                let name = file
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| file.name.clone());
                let bytes = match (&file.bytes, &file.path) {
                    (Some(bytes), _) => Some(bytes.to_vec()),
                    (None, Some(path)) => std::fs::read(path).ok(),
                    (None, None) => None,
                };
                bytes.map(|bytes| (name, bytes))
            })
        });
        if let Some((name, data)) = dropped {
            self.load(&name, &data);
        }
    }
}
