use eframe::egui;

use super::app::{bubble, TutorApp};
use super::summary_card::draw_summary_card;
use crate::engine::prompt::FINISH_HINT;

pub fn draw_center_panel(ctx: &egui::Context, app: &mut TutorApp) {
    // ---------- Input bar ----------
    egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
        ui.add_space(8.0);
        draw_input_area(ui, app);
        ui.add_space(8.0);
    });

    // ---------- Chat history ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        if app.session.messages.is_empty() && !app.session.is_loading {
            draw_welcome(ui, app);
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for msg in &app.session.messages {
                    app.draw_message(ui, msg);
                }

                if app.session.is_loading {
                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        ui.spinner();
                        bubble(ui, app.theme.tutor, "Thinking...");
                    });
                }

                if app.session.is_finished {
                    ui.add_space(12.0);
                    draw_summary_card(ui, &app.session, &app.theme);
                }
            });
    });
}

fn draw_input_area(ui: &mut egui::Ui, app: &mut TutorApp) {
    let is_loading = app.session.is_loading;

    if app.session.is_finished || !app.session.is_active {
        let label = if app.session.is_finished {
            "Start New Session"
        } else {
            "Start Practice"
        };
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(egui::RichText::new(label).strong().size(16.0))
                .fill(app.theme.accent)
                .min_size(egui::vec2(180.0, 36.0));
            if ui.add_enabled(!is_loading, button).clicked() {
                app.start_session();
            }
        });
        return;
    }

    let input_id = egui::Id::new("chat_input_box");
    let enabled = !is_loading;
    let mut send_now = false;

    ui.horizontal(|ui| {
        let response = ui.add_enabled(
            enabled,
            egui::TextEdit::singleline(&mut app.input_text)
                .id(input_id)
                .hint_text("Type your answer here...")
                .desired_width(ui.available_width() - 70.0),
        );

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send_now = true;
        }

        let can_send = enabled && !app.input_text.trim().is_empty();
        if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
            send_now = true;
        }

        if app.focus_input && enabled {
            response.request_focus();
            app.focus_input = false;
        }
    });

    ui.vertical_centered(|ui| {
        ui.label(egui::RichText::new(FINISH_HINT).small().weak());
    });

    if send_now {
        app.submit_input();
        // Keep cursor focused
        ui.memory_mut(|m| m.request_focus(input_id));
    }
}

fn draw_welcome(ui: &mut egui::Ui, app: &TutorApp) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.15);
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(20))
            .show(ui, |ui| {
                ui.set_max_width(420.0);
                ui.heading("Cafe Trainer");
                ui.label("Practise \"some, any, much, many\" while ordering at a café or market.");
                ui.add_space(12.0);

                ui.label(egui::RichText::new("How scoring works").strong());
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("+1").strong().color(egui::Color32::LIGHT_GREEN));
                    ui.label("Order correctly on the first try.");
                });
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(" 0").strong());
                    ui.label("Get it right after a correction.");
                });
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("-1").strong().color(app.theme.mistakes));
                    ui.label("Three wrong attempts on the same point.");
                });
            });
    });
}
