use eframe::egui;
use egui::Layout;
use std::sync::mpsc;
use tracing::error;

use crate::engine::engine::Engine;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::model::message::Message;
use crate::model::session::Session;
use crate::ui::settings::TutorSettings;
use crate::ui::{center_panel, right_panel, settings_window};

/* =========================
   Theme
   ========================= */

#[derive(Clone)]
pub struct Theme {
    pub tutor: egui::Color32,
    pub user: egui::Color32,
    pub error: egui::Color32,
    pub accent: egui::Color32,
    pub score: egui::Color32,
    pub mistakes: egui::Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            tutor: egui::Color32::from_rgb(60, 64, 72),
            user: egui::Color32::from_rgb(40, 70, 120),
            error: egui::Color32::from_rgb(140, 50, 50),
            accent: egui::Color32::from_rgb(217, 119, 6),
            score: egui::Color32::from_rgb(59, 130, 246),
            mistakes: egui::Color32::from_rgb(234, 88, 12),
        }
    }
}

/* =========================
   App
   ========================= */

pub struct TutorApp {
    /// Latest snapshot from the engine. Never edited on this side.
    pub(super) session: Session,
    pub(super) input_text: String,
    pub(super) focus_input: bool,

    pub(super) settings: TutorSettings,
    pub(super) settings_draft: TutorSettings,
    pub(super) show_settings: bool,
    pub(super) connection_status: Option<Result<String, String>>,

    start_error: Option<String>,
    pub(super) theme: Theme,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl TutorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: TutorSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let repaint = cc.egui_ctx.clone();
        let engine_settings = settings.clone();
        std::thread::spawn(move || {
            let mut engine = Engine::new(
                cmd_rx,
                resp_tx,
                engine_settings,
                Box::new(move || repaint.request_repaint()),
            );
            engine.run();
        });

        Self {
            session: Session::default(),
            input_text: String::new(),
            focus_input: false,
            settings_draft: settings.clone(),
            settings,
            show_settings: false,
            connection_status: None,
            start_error: None,
            theme: Theme::default(),
            cmd_tx,
            resp_rx,
        }
    }

    pub(super) fn send_command(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            error!("engine thread has stopped");
        }
    }

    pub(super) fn start_session(&mut self) {
        self.input_text.clear();
        self.send_command(EngineCommand::StartSession);
    }

    /// Blank input and input while a reply is pending are ignored.
    pub(super) fn submit_input(&mut self) {
        let text = self.input_text.trim().to_string();
        if text.is_empty() || !self.session.accepts_input() {
            return;
        }
        self.send_command(EngineCommand::UserInput(text));
        self.input_text.clear();
    }

    pub(super) fn apply_settings(&mut self) {
        self.settings = self.settings_draft.clone();
        crate::ui::settings_io::save_settings(&self.settings);
        self.send_command(EngineCommand::UpdateSettings(self.settings.clone()));
    }

    fn poll_engine(&mut self) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            match resp {
                EngineResponse::Session(session) => {
                    if self.session.is_loading && !session.is_loading {
                        self.focus_input = true;
                    }
                    self.session = session;
                }
                EngineResponse::StartFailed(message) => {
                    self.start_error = Some(message);
                }
                EngineResponse::ConnectionStatus(status) => {
                    self.connection_status = Some(status);
                }
            }
        }
    }

    pub(super) fn draw_message(&self, ui: &mut egui::Ui, msg: &Message) {
        let bg = if msg.is_error {
            self.theme.error
        } else if msg.is_tutor() {
            self.theme.tutor
        } else {
            self.theme.user
        };
        let text = if msg.text.is_empty() { "..." } else { msg.text.as_str() };

        ui.add_space(6.0);

        if msg.is_tutor() {
            ui.label(egui::RichText::new("Tutor").small().weak());
            bubble(ui, bg, text);
            if msg.is_error {
                ui.label(
                    egui::RichText::new("Tracking data unreadable; this turn was not scored.")
                        .small()
                        .color(self.theme.mistakes),
                );
            }
        } else {
            ui.with_layout(Layout::right_to_left(egui::Align::TOP), |ui| {
                bubble(ui, bg, text);
            });
        }
    }

    fn draw_start_error(&mut self, ctx: &egui::Context) {
        let Some(message) = self.start_error.clone() else {
            return;
        };

        let modal = egui::Modal::new(egui::Id::new("start_failed")).show(ctx, |ui| {
            ui.set_width(360.0);
            ui.heading("Session could not start");
            ui.add_space(6.0);
            ui.label(message);
            ui.add_space(10.0);
            ui.button("OK").clicked()
        });

        if modal.inner || modal.should_close() {
            self.start_error = None;
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);

        self.poll_engine();

        draw_header(ctx, self);
        right_panel::draw_stats_panel(ctx, self);
        center_panel::draw_center_panel(ctx, self);
        settings_window::draw_settings_window(ctx, self);
        self.draw_start_error(ctx);
    }
}

fn draw_header(ctx: &egui::Context, app: &mut TutorApp) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.heading("Cafe Trainer");
            ui.label(egui::RichText::new("Quantifier practice").weak());

            ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Settings").clicked() {
                    app.settings_draft = app.settings.clone();
                    app.connection_status = None;
                    app.show_settings = !app.show_settings;
                }
                if !app.session.is_active && !app.session.is_loading {
                    ui.label(egui::RichText::new("Ready when you are").weak());
                }
            });
        });
        ui.add_space(4.0);
    });
}

/* =========================
   UI Helpers
   ========================= */

pub(super) fn bubble(ui: &mut egui::Ui, color: egui::Color32, text: &str) {
    let max_width = ui.available_width() * 0.75;
    egui::Frame::new()
        .fill(color)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::symmetric(10, 6))
        .show(ui, |ui| {
            ui.set_max_width(max_width);
            ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
        });
}
