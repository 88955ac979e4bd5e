use egui::Ui;
use specenv::config::{
    BANDS, MAX_ATTACK_MS, MAX_BANDWIDTH_PERCENT, MAX_RELEASE_MS, MIN_ATTACK_MS,
    MIN_BANDWIDTH_PERCENT, MIN_RELEASE_MS, REFERENCE_VOLTAGE,
};
use specenv::params::{freq_to_pot, pot_to_freq};
use specenv::{DetectionMode, FftSize, OutputMode, SharedParameters};

use super::spectrum::{BAND_COLORS, step_y_scale};

fn param_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: std::ops::RangeInclusive<f32>,
    text: &str,
    suffix: &str,
) -> bool {
    ui.horizontal(|ui| {
        ui.label(text);
        ui.add(
            egui::Slider::new(value, range)
                .logarithmic(true)
                .suffix(suffix)
                .text(""),
        )
    })
    .inner
    .changed()
}

fn output_mode_name(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Replace => "Replace",
        OutputMode::Add => "Add",
    }
}

fn format_freq(freq: f32) -> String {
    if freq >= 1000.0 {
        format!("{:.2} kHz", freq / 1000.0)
    } else {
        format!("{:.0} Hz", freq)
    }
}

/// One column per band: frequency pot, output mode and CV meter.
pub fn draw_band_controls(ui: &mut Ui, shared: &SharedParameters, levels: &[f32; BANDS]) {
    let params = shared.snapshot();

    ui.columns(BANDS, |columns| {
        for (band, ui) in columns.iter_mut().enumerate() {
            ui.vertical(|ui| {
                ui.colored_label(BAND_COLORS[band], format!("Band {}", band + 1));

                let mut pot = freq_to_pot(params.frequencies[band]);
                let response = ui.add(
                    egui::Slider::new(&mut pot, 0.0..=1.0)
                        .show_value(false)
                        .text(""),
                );
                if response.changed() {
                    shared.set_frequency(band, pot_to_freq(pot).round());
                }
                ui.label(format_freq(params.frequencies[band]));

                let mut mode = params.output_modes[band];
                egui::ComboBox::from_id_salt(("output_mode", band))
                    .selected_text(output_mode_name(mode))
                    .show_ui(ui, |ui| {
                        for option in [OutputMode::Replace, OutputMode::Add] {
                            ui.selectable_value(&mut mode, option, output_mode_name(option));
                        }
                    });
                if mode != params.output_modes[band] {
                    shared.set_output_mode(band, mode);
                }

                let volts = levels[band];
                ui.add(
                    egui::ProgressBar::new(volts / REFERENCE_VOLTAGE)
                        .fill(BAND_COLORS[band].gamma_multiply(0.6))
                        .text(format!("{:.2} V", volts)),
                );
            });
        }
    });
}

/// Controls shared by every band. Returns the new display scale.
pub fn draw_shared_controls(ui: &mut Ui, shared: &SharedParameters, y_scale: f32) -> f32 {
    let params = shared.snapshot();
    let mut y_scale = y_scale;

    ui.columns(2, |columns| {
        let mut bandwidth = params.bandwidth_percent;
        if param_slider(
            &mut columns[0],
            &mut bandwidth,
            MIN_BANDWIDTH_PERCENT..=MAX_BANDWIDTH_PERCENT,
            "Bandwidth",
            " %",
        ) {
            shared.set_bandwidth_percent(bandwidth);
        }

        let mut attack = params.attack_ms;
        if param_slider(
            &mut columns[0],
            &mut attack,
            MIN_ATTACK_MS..=MAX_ATTACK_MS,
            "Attack",
            " ms",
        ) {
            shared.set_attack_ms(attack);
        }

        let mut release = params.release_ms;
        if param_slider(
            &mut columns[0],
            &mut release,
            MIN_RELEASE_MS..=MAX_RELEASE_MS,
            "Release",
            " ms",
        ) {
            shared.set_release_ms(release);
        }

        let ui = &mut columns[1];

        let mut detection = params.detection;
        egui::ComboBox::from_label("Detection")
            .selected_text(detection.name())
            .show_ui(ui, |ui| {
                for option in [DetectionMode::Power, DetectionMode::Peak] {
                    ui.selectable_value(&mut detection, option, option.name());
                }
            });
        if detection != params.detection {
            shared.set_detection(detection);
        }

        let current = shared.fft_size();
        let mut size = current;
        egui::ComboBox::from_label("FFT Size")
            .selected_text(size.to_string())
            .show_ui(ui, |ui| {
                for option in FftSize::ALL {
                    ui.selectable_value(&mut size, option, option.to_string());
                }
            });
        if size != current {
            shared.set_fft_size(size);
        }

        ui.horizontal(|ui| {
            ui.label("Y Scale");
            if ui.button("x1/2").clicked() {
                y_scale = step_y_scale(y_scale, false);
            }
            ui.label(format!("{}", y_scale));
            if ui.button("x2").clicked() {
                y_scale = step_y_scale(y_scale, true);
            }
        });
    });

    y_scale
}
