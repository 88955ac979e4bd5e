use specenv::config::{BANDS, MAX_FREQ, MAX_Y_SCALE, MIN_FREQ, MIN_Y_SCALE};

use crate::audio::SpectrumView;

pub const BAND_COLORS: [egui::Color32; BANDS] = [
    egui::Color32::from_rgb(240, 240, 240),
    egui::Color32::from_rgb(250, 180, 60),
    egui::Color32::from_rgb(90, 200, 120),
];

const FLOOR_DB: f32 = -96.0;

pub fn lerp_rgba(from: egui::Rgba, to: egui::Rgba, t: f32) -> egui::Rgba {
    egui::Rgba::from_rgba_premultiplied(
        from.r() + (to.r() - from.r()) * t,
        from.g() + (to.g() - from.g()) * t,
        from.b() + (to.b() - from.b()) * t,
        from.a() + (to.a() - from.a()) * t,
    )
}

/// Doubles or halves the display scale, staying inside its limits.
pub fn step_y_scale(y_scale: f32, up: bool) -> f32 {
    let next = if up { y_scale * 2.0 } else { y_scale * 0.5 };
    next.clamp(MIN_Y_SCALE, MAX_Y_SCALE)
}

fn freq_to_x(freq: f32, rect: egui::Rect) -> f32 {
    let log_min = MIN_FREQ.log10();
    let log_max = MAX_FREQ.log10();
    rect.left() + rect.width() * (freq.max(MIN_FREQ).log10() - log_min) / (log_max - log_min)
}

pub fn draw_spectrum(ui: &mut egui::Ui, view: &SpectrumView, y_scale: f32) {
    ui.group(|ui| {
        ui.set_height(220.0);
        ui.heading(format!("Spectrum ({}-point)", view.fft_size));

        // margins
        let left_margin = 45.0;
        let bottom_margin = 15.0;

        let available_width = ui.available_width();
        let available_height = ui.available_height();

        let response = ui.allocate_rect(
            egui::Rect::from_min_size(
                ui.min_rect().min,
                egui::vec2(available_width, available_height),
            ),
            egui::Sense::hover(),
        );

        let painter = ui.painter();
        let rect = response.rect;

        let graph_rect = egui::Rect::from_min_max(
            egui::pos2(rect.left() + left_margin, rect.top()),
            egui::pos2(rect.right(), rect.bottom() - bottom_margin),
        );

        painter.rect_filled(rect, 5.0, egui::Color32::from_rgb(20, 20, 30));

        let grid_color = egui::Color32::from_rgba_premultiplied(100, 100, 100, 100);
        let label_color = egui::Color32::from_rgb(180, 180, 180);

        // Level Indicators
        for i in 0..=4 {
            let y = graph_rect.top() + (i as f32 * graph_rect.height() / 4.0);
            painter.line_segment(
                [egui::pos2(graph_rect.left(), y), egui::pos2(graph_rect.right(), y)],
                egui::Stroke::new(1.0, grid_color),
            );

            let db = FLOOR_DB * i as f32 / 4.0 / y_scale;
            painter.text(
                egui::pos2(rect.left() + 5.0, y),
                egui::Align2::LEFT_CENTER,
                format!("{:+.0} dB", db),
                egui::FontId::proportional(9.0),
                label_color,
            );
        }

        let freq_labels = [
            (50.0, "50Hz"),
            (100.0, "100Hz"),
            (500.0, "500Hz"),
            (1000.0, "1kHz"),
            (5000.0, "5kHz"),
            (10000.0, "10kHz"),
        ];
        for (freq, label) in freq_labels {
            let x_pos = freq_to_x(freq, graph_rect);
            painter.line_segment(
                [egui::pos2(x_pos, graph_rect.top()), egui::pos2(x_pos, graph_rect.bottom())],
                egui::Stroke::new(1.0, grid_color),
            );
            painter.text(
                egui::pos2(x_pos, rect.bottom() - 5.0),
                egui::Align2::CENTER_CENTER,
                label,
                egui::FontId::proportional(9.0),
                label_color,
            );
        }

        let bin_hz = view.bin_hz();
        let spectrum = view.spectrum();
        if bin_hz <= 0.0 || spectrum.is_empty() {
            return;
        }

        // Hann coherent gain is about N/2, interior bins fold in their mirror
        let amplitude_scale = 4.0 / view.fft_size.len() as f32;
        let base_color = egui::Color32::from_rgb(30, 70, 140);
        let bright_color = egui::Color32::from_rgb(50, 120, 250);

        for (bin, &mag) in spectrum.iter().enumerate().skip(1) {
            let freq = bin as f32 * bin_hz;
            if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
                continue;
            }

            let db = 20.0 * (mag * amplitude_scale + 1e-10).log10();
            let normalized = ((1.0 - db / FLOOR_DB) * y_scale).clamp(0.0, 1.0);
            if normalized <= 0.0 {
                continue;
            }

            let left = freq_to_x(freq - bin_hz / 2.0, graph_rect);
            let right = freq_to_x(freq + bin_hz / 2.0, graph_rect).max(left + 1.0);
            let bar_color = lerp_rgba(
                egui::Rgba::from(base_color),
                egui::Rgba::from(bright_color),
                normalized,
            );

            painter.rect_filled(
                egui::Rect::from_min_max(
                    egui::pos2(left, graph_rect.bottom() - normalized * graph_rect.height()),
                    egui::pos2(right, graph_rect.bottom()),
                ),
                0.0,
                egui::Color32::from(bar_color),
            );
        }

        // Band centre markers
        for (band, &center_bin) in view.center_bins.iter().enumerate() {
            let freq = center_bin * bin_hz;
            if center_bin < 1.0 || center_bin >= view.bins as f32 {
                continue;
            }
            let x = freq_to_x(freq, graph_rect);
            let color = BAND_COLORS[band];

            painter.line_segment(
                [egui::pos2(x, graph_rect.top()), egui::pos2(x, graph_rect.bottom())],
                egui::Stroke::new(1.5, color),
            );
            painter.line_segment(
                [egui::pos2(x - 3.0, graph_rect.top()), egui::pos2(x + 3.0, graph_rect.top())],
                egui::Stroke::new(2.0, color),
            );
        }
    });
}
