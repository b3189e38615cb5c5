//! Settings panel
//!
//! One slider per [`Setting`], edited through the [`SimulationSettings`]
//! capability. Toggled with Tab; brush and gravity well input are disabled
//! while it is open.

use egui::{Context, Ui};

use crate::settings::{Setting, SimulationSettings};

/// Ranges wider than this ratio get a logarithmic slider.
const LOGARITHMIC_RATIO: f32 = 1_000.0;

/// Draw the settings window. Returns true if any value changed.
pub fn settings_panel(ctx: &Context, settings: &mut dyn SimulationSettings) -> bool {
    let mut changed = false;

    egui::Window::new("Settings")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new("Left mouse paints, right mouse erases, Q/E pull/push, W resets")
                    .small()
                    .weak(),
            );
            ui.separator();

            for setting in Setting::ALL {
                changed |= setting_slider(ui, settings, setting);
            }
        });

    changed
}

fn setting_slider(ui: &mut Ui, settings: &mut dyn SimulationSettings, setting: Setting) -> bool {
    let descriptor = setting.descriptor();
    let mut value = setting.value(settings);

    let (start, end) = (*descriptor.range.start(), *descriptor.range.end());
    let logarithmic = start > 0.0 && end / start > LOGARITHMIC_RATIO;

    let mut slider = egui::Slider::new(&mut value, descriptor.range)
        .text(descriptor.label.trim_end_matches(" :"))
        .logarithmic(logarithmic);
    if setting.is_integer() {
        slider = slider.integer();
    }

    let response = ui.add(slider).on_hover_text(descriptor.help);
    if response.changed() {
        setting.apply(settings, value);
        return true;
    }
    false
}
