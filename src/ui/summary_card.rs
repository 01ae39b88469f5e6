use eframe::egui;

use super::app::Theme;
use crate::model::session::Session;

/// End-of-session card shown under the last message.
pub fn draw_summary_card(ui: &mut egui::Ui, session: &Session, theme: &Theme) {
    ui.vertical_centered(|ui| {
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(16))
            .show(ui, |ui| {
                ui.set_max_width(420.0);

                ui.label(
                    egui::RichText::new("🏆 Session Complete!")
                        .size(20.0)
                        .strong()
                        .color(theme.accent),
                );
                ui.label(egui::RichText::new("That was great practice.").weak());
                ui.add_space(10.0);

                egui::Grid::new("summary_totals")
                    .num_columns(2)
                    .spacing([40.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("TOTAL SCORE").small().weak());
                        ui.label(egui::RichText::new("TOTAL ERRORS").small().weak());
                        ui.end_row();

                        ui.label(
                            egui::RichText::new(session.score.to_string())
                                .size(26.0)
                                .strong()
                                .color(theme.accent),
                        );
                        ui.label(
                            egui::RichText::new(session.total_errors.to_string())
                                .size(26.0)
                                .strong()
                                .color(theme.mistakes),
                        );
                        ui.end_row();
                    });

                ui.separator();
                ui.label(egui::RichText::new("Mistake breakdown").strong());

                let mut any = false;
                for (kind, count) in session.mistakes.reportable() {
                    any = true;
                    ui.horizontal(|ui| {
                        ui.label(kind.display_name());
                        ui.label(
                            egui::RichText::new(format!("{count} errors"))
                                .color(theme.mistakes),
                        );
                    });
                }
                if !any {
                    ui.label(
                        egui::RichText::new("✔ No mistakes at all. Perfect!")
                            .color(egui::Color32::LIGHT_GREEN),
                    );
                }

                ui.separator();
                ui.label(
                    egui::RichText::new(format!("{} turns in total.", session.total_turns()))
                        .small()
                        .weak(),
                );
            });
    });
}
