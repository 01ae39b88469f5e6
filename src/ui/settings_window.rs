use eframe::egui;

use super::app::TutorApp;
use super::settings::Provider;
use crate::engine::protocol::EngineCommand;

pub fn draw_settings_window(ctx: &egui::Context, app: &mut TutorApp) {
    if !app.show_settings {
        return;
    }

    let mut open = true;
    let mut save = false;
    let mut test = false;

    egui::Window::new("Settings")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            let draft = &mut app.settings_draft;

            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Provider");
                    egui::ComboBox::from_id_salt("provider")
                        .selected_text(draft.provider.label())
                        .show_ui(ui, |ui| {
                            for provider in [Provider::Gemini, Provider::OpenAiCompatible] {
                                ui.selectable_value(&mut draft.provider, provider, provider.label());
                            }
                        });
                    ui.end_row();

                    ui.label("Model");
                    ui.text_edit_singleline(&mut draft.model);
                    ui.end_row();

                    ui.label("API key");
                    let mut key = draft.api_key.clone().unwrap_or_default();
                    if ui
                        .add(egui::TextEdit::singleline(&mut key).password(true))
                        .changed()
                    {
                        draft.api_key = Some(key).filter(|k| !k.trim().is_empty());
                    }
                    ui.end_row();

                    if draft.provider == Provider::OpenAiCompatible {
                        ui.label("Base URL");
                        ui.text_edit_singleline(&mut draft.base_url);
                        ui.end_row();
                    }

                    ui.label("Temperature");
                    ui.add(egui::Slider::new(&mut draft.temperature, 0.0..=2.0));
                    ui.end_row();

                    ui.label("Top-p");
                    ui.add(egui::Slider::new(&mut draft.top_p, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Max output tokens");
                    ui.add(egui::DragValue::new(&mut draft.max_output_tokens).range(64..=8192));
                    ui.end_row();

                    ui.label("UI scale");
                    ui.add(egui::Slider::new(&mut draft.ui_scale, 0.75..=2.0));
                    ui.end_row();
                });

            if draft.api_key.is_none() {
                ui.label(
                    egui::RichText::new("Leave the key empty to use GEMINI_API_KEY from the environment.")
                        .small()
                        .weak(),
                );
            }

            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    save = true;
                }
                if ui.button("Test connection").clicked() {
                    test = true;
                }
            });

            match &app.connection_status {
                Some(Ok(msg)) => {
                    ui.label(egui::RichText::new(msg).color(egui::Color32::LIGHT_GREEN));
                }
                Some(Err(err)) => {
                    ui.label(egui::RichText::new(err).color(egui::Color32::LIGHT_RED));
                }
                None => {}
            }
        });

    if save || test {
        // Test against what is on screen, so apply the draft first.
        app.apply_settings();
        app.connection_status = None;
    }
    if test {
        app.send_command(EngineCommand::CheckConnection);
    }
    if !open {
        app.show_settings = false;
    }
}
