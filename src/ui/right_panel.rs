use eframe::egui;

use super::app::TutorApp;
use crate::model::session::Scene;

pub fn draw_stats_panel(ctx: &egui::Context, app: &TutorApp) {
    egui::SidePanel::right("stats")
        .resizable(false)
        .default_width(240.0)
        .show(ctx, |ui| {
            let session = &app.session;
            let theme = &app.theme;

            ui.add_space(8.0);

            /* -------- Scene -------- */

            ui.label(egui::RichText::new("CURRENT SCENE").small().weak());
            let icon = match session.scene {
                Scene::Cafe => "☕",
                Scene::Market => "🧺",
            };
            ui.label(
                egui::RichText::new(format!("{icon} {}", session.scene.title()))
                    .size(18.0)
                    .strong(),
            );

            ui.separator();

            /* -------- Score -------- */

            ui.label(egui::RichText::new("SCORE").small().weak());
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(session.score.to_string())
                        .size(24.0)
                        .strong()
                        .color(theme.score),
                );
                ui.label(egui::RichText::new("points").weak());
            });

            ui.separator();

            /* -------- Mistakes -------- */

            ui.label(egui::RichText::new("MISTAKES").small().weak());
            ui.horizontal(|ui| {
                ui.label("Total Errors");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        egui::RichText::new(session.total_errors.to_string())
                            .strong()
                            .color(theme.mistakes),
                    );
                });
            });

            ui.add_space(4.0);
            for (kind, count) in session.mistakes.reportable() {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(kind.display_name()).small());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(egui::RichText::new(count.to_string()).small().strong());
                    });
                });
            }

            if session.total_errors == 0 {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new("No mistakes yet! Keep it up.").small().weak());
                });
            }
        });
}
