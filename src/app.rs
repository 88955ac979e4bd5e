use std::sync::{Arc, Mutex};

use cpal::Host;
use eframe::{App, CreationContext, egui};
use tracing::{error, info, warn};

use specenv::config::{AppConfig, BANDS};
use specenv::{Error, Parameters, Result, SharedParameters};

use crate::audio::devices::{default_input_index, find_input_device, input_device_names};
use crate::audio::{AnalyzerEngine, SpectrumView};
use crate::ui::{draw_band_controls, draw_shared_controls, draw_spectrum};

pub struct SpecEnvApp {
    host: Host,
    config: AppConfig,
    params: Arc<SharedParameters>,
    view: Arc<Mutex<SpectrumView>>,
    engine: Option<AnalyzerEngine>,
    devices: Vec<String>,
    device_index: usize,
    y_scale: f32,
    levels: [f32; BANDS],
    status: Option<String>,
}

impl SpecEnvApp {
    pub fn new(_cc: &CreationContext, config: AppConfig) -> Self {
        let host = cpal::default_host();
        let devices = input_device_names(&host);

        let device_index = config
            .input_device
            .as_ref()
            .and_then(|name| devices.iter().position(|d| d == name))
            .unwrap_or_else(|| default_input_index(&host, &devices));

        let params = Arc::new(SharedParameters::new(&config.parameters, config.fft_size()));

        let mut app = Self {
            host,
            config,
            params,
            view: Arc::new(Mutex::new(SpectrumView::default())),
            engine: None,
            devices,
            device_index,
            y_scale: 1.0,
            levels: [0.0; BANDS],
            status: None,
        };

        if let Err(e) = app.start_processing() {
            warn!("could not start on launch: {}", e);
            app.status = Some(e.to_string());
        }

        app
    }

    fn selected_device(&self) -> Result<cpal::Device> {
        let name = self
            .devices
            .get(self.device_index)
            .ok_or_else(|| Error::Audio("No input device selected".to_string()))?;

        find_input_device(&self.host, Some(name))
            .ok_or_else(|| Error::Audio(format!("Input device '{}' not found", name)))
    }

    pub fn start_processing(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }

        let device = self.selected_device()?;
        let engine = AnalyzerEngine::start(
            &device,
            self.params.clone(),
            self.view.clone(),
            self.config.analysis_rate_hz,
        )?;

        info!(
            device = self.devices.get(self.device_index).map(String::as_str),
            sample_rate = engine.sample_rate,
            "processing started"
        );
        self.engine = Some(engine);
        self.status = None;
        Ok(())
    }

    pub fn stop_processing(&mut self) {
        self.engine = None;
        self.levels = [0.0; BANDS];
        info!("processing stopped");
    }

    fn reset_parameters(&mut self) {
        let defaults = Parameters::default();
        for (band, &freq) in defaults.frequencies.iter().enumerate() {
            self.params.set_frequency(band, freq);
            self.params.set_output_mode(band, defaults.output_modes[band]);
        }
        self.params.set_bandwidth_percent(defaults.bandwidth_percent);
        self.params.set_attack_ms(defaults.attack_ms);
        self.params.set_release_ms(defaults.release_ms);
        self.params.set_detection(defaults.detection);
    }
}

impl App for SpecEnvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let running = self.engine.is_some();

        if let Some(engine) = self.engine.as_mut() {
            self.levels = engine.levels();
            ctx.request_repaint();
        }

        // controls
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                if ui
                    .button(if running {
                        "Stop Processing"
                    } else {
                        "Start Processing"
                    })
                    .clicked()
                {
                    if running {
                        self.stop_processing();
                    } else if let Err(e) = self.start_processing() {
                        error!("Failed to start processing: {}", e);
                        self.status = Some(e.to_string());
                    }
                }

                if ui.button("Reset Parameters").clicked() {
                    self.reset_parameters();
                }

                ui.label(match (&self.status, running) {
                    (Some(status), _) => format!("Status: {}", status),
                    (None, true) => "Status: Running".to_string(),
                    (None, false) => "Status: Stopped".to_string(),
                });
            });
        });

        // device selection
        egui::SidePanel::right("devices_panel").show(ctx, |ui| {
            ui.heading("Audio Input");

            let mut new_index = self.device_index;
            egui::ComboBox::from_label("Input Device")
                .selected_text(
                    self.devices
                        .get(self.device_index)
                        .map(String::as_str)
                        .unwrap_or("None"),
                )
                .show_ui(ui, |ui| {
                    for (i, name) in self.devices.iter().enumerate() {
                        ui.selectable_value(&mut new_index, i, name);
                    }
                });
            self.device_index = new_index;

            if ui.button("Apply Device Settings").clicked() && running {
                self.stop_processing();
                if let Err(e) = self.start_processing() {
                    error!("Failed to restart processing: {}", e);
                    self.status = Some(e.to_string());
                }
            }

            if let Some(engine) = &self.engine {
                ui.label(format!("{} Hz", engine.sample_rate));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Spectral Envelope");

            {
                let view = self.view.lock().unwrap_or_else(|e| e.into_inner());
                draw_spectrum(ui, &view, self.y_scale);
            }

            ui.add_space(8.0);
            draw_band_controls(ui, &self.params, &self.levels);

            ui.separator();
            self.y_scale = draw_shared_controls(ui, &self.params, self.y_scale);
        });
    }
}
