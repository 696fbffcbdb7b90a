/*!
 * Desktop dashboard for idb-rs - U.S. Census International Database population explorer
 *
 * A cross-platform desktop application providing:
 * - Headline statistics and a searchable, sortable country table
 * - Year and age-range selection (refetches), search and sort (local only)
 * - A detail panel per country with the latest record, gender split and chart export
 *
 * Platform support: Windows, macOS, Linux
 */

use eframe::egui;
use idb_rs::api::HISTORY_YEARS;
use idb_rs::config::{API_KEY_ENV, BASE_URL_ENV};
use idb_rs::generation::{Generations, Latest, Ticket};
use idb_rs::summarize;
use idb_rs::viz::util::{format_count, map_locale};
use idb_rs::{AgeBucket, Client, ClientConfig, CountrySummary, QueryInput, SortMode, ViewInput};
use idb_rs::{YearlySummary, storage, viz};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([760.0, 480.0])
            .with_title("World Population - idb-rs"),
        ..Default::default()
    };

    eframe::run_native(
        "IDB Population Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(IdbApp::new()))),
    )
}

/// Dashboard table contents, replaced wholesale by each committed fetch.
#[derive(Debug, Clone)]
enum TableState {
    Ready(Arc<Vec<CountrySummary>>),
    Failed(String),
}

#[derive(Debug)]
struct Detail {
    series: Vec<YearlySummary>,
    ages: Vec<AgeBucket>,
}

#[derive(Debug, Clone)]
enum DetailState {
    Ready(Arc<Detail>),
    NotFound(String),
}

/// Results travelling back from worker threads, tagged with their request ticket.
enum Message {
    Table(Ticket, TableState),
    Detail(Ticket, DetailState),
}

/// Main application state
struct IdbApp {
    client: Client,

    // Inputs that trigger a refetch
    query: QueryInput,

    // Inputs applied locally
    search: String,
    sort: SortMode,
    locale: String,

    table_gens: Generations,
    table: Latest<TableState>,
    selected: Option<String>,
    detail_gens: Generations,
    detail: Latest<DetailState>,

    status_message: String,
    error_message: String,

    sender: mpsc::Sender<Message>,
    receiver: mpsc::Receiver<Message>,
}

impl IdbApp {
    fn new() -> Self {
        let config = ClientConfig::default()
            .with_api_key(std::env::var(API_KEY_ENV).ok());
        let config = match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => config,
        };
        let client = Client::new(&config).unwrap_or_else(|err| {
            warn!("falling back to default client: {}", err);
            Client::default()
        });
        let (sender, receiver) = mpsc::channel();

        let mut app = Self {
            client,
            query: QueryInput::default(),
            search: String::new(),
            sort: SortMode::default(),
            locale: "en".to_string(),
            table_gens: Generations::new(),
            table: Latest::new(),
            selected: None,
            detail_gens: Generations::new(),
            detail: Latest::new(),
            status_message: String::new(),
            error_message: String::new(),
            sender,
            receiver,
        };
        app.fetch_table();
        app
    }

    fn table_loading(&self) -> bool {
        self.table_gens.current() != self.table.generation()
    }

    fn detail_loading(&self) -> bool {
        self.detail_gens.current() != self.detail.generation()
    }

    fn fetch_table(&mut self) {
        let ticket = self.table_gens.issue();
        let client = self.client.clone();
        let sender = self.sender.clone();
        let query = self.query.normalized().to_query();
        self.error_message.clear();

        thread::spawn(move || {
            if !ticket.is_current() {
                return;
            }
            let state = match client.fetch_table(&query) {
                Ok(table) => TableState::Ready(Arc::new(summarize::summarize_countries(&table))),
                Err(err) => TableState::Failed(err.to_string()),
            };
            let _ = sender.send(Message::Table(ticket, state));
        });
    }

    fn fetch_detail(&mut self, code: String) {
        let ticket = self.detail_gens.issue();
        let client = self.client.clone();
        let sender = self.sender.clone();
        self.selected = Some(code.clone());

        thread::spawn(move || {
            if !ticket.is_current() {
                return;
            }
            // Every failure of the detail view is shown as "not found".
            let state = match client.fetch_history(&code, HISTORY_YEARS) {
                Ok(table) => {
                    let series = summarize::summarize_series(&table);
                    if series.is_empty() {
                        DetailState::NotFound(code)
                    } else {
                        let ages = summarize::age_distribution(&table);
                        DetailState::Ready(Arc::new(Detail { series, ages }))
                    }
                }
                Err(err) => {
                    debug!("detail fetch for {} failed: {}", code, err);
                    DetailState::NotFound(code)
                }
            };
            let _ = sender.send(Message::Detail(ticket, state));
        });
    }

    fn drain_messages(&mut self) {
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                Message::Table(ticket, state) => {
                    let failed = match &state {
                        TableState::Failed(err) => Some(err.clone()),
                        TableState::Ready(_) => None,
                    };
                    if self.table.commit(&ticket, state)
                        && let Some(err) = failed
                    {
                        self.error_message = format!("Failed to load population data: {}", err);
                    }
                }
                Message::Detail(ticket, state) => {
                    self.detail.commit(&ticket, state);
                }
            }
        }
    }

    fn export_table(&mut self, rows: &[CountrySummary], json: bool) {
        let (name, ext) = if json {
            (format!("countries_{}.json", self.query.year), "json")
        } else {
            (format!("countries_{}.csv", self.query.year), "csv")
        };
        let Some(path) = save_dialog(&name, ext) else {
            return;
        };
        let result = if json {
            storage::save_json(rows, &path)
        } else {
            storage::save_countries_csv(rows, &path)
        };
        self.report(result, &path);
    }

    fn export_detail(&mut self, detail: &Detail, what: DetailExport) {
        let Some(last) = summarize::latest(&detail.series) else {
            return;
        };
        let code = last.code.clone();
        let name = match what {
            DetailExport::SeriesCsv => format!("{code}_series.csv"),
            DetailExport::SeriesJson => format!("{code}_series.json"),
            DetailExport::SeriesChart => format!("{code}_population.svg"),
            DetailExport::AgeChart => format!("{code}_ages.svg"),
        };
        let ext = name.rsplit('.').next().unwrap_or("csv");
        let Some(path) = save_dialog(&name, ext) else {
            return;
        };
        let result = match what {
            DetailExport::SeriesCsv => storage::save_series_csv(&detail.series, &path),
            DetailExport::SeriesJson => storage::save_json(&detail.series, &path),
            DetailExport::SeriesChart => {
                viz::plot_series(&detail.series, &path, 1000, 600, &self.locale)
            }
            DetailExport::AgeChart => {
                let title = format!("{}: population by age", last.country);
                viz::plot_age_distribution(&detail.ages, &title, &path, 1000, 600, &self.locale)
            }
        };
        self.report(result, &path);
    }

    fn report(&mut self, result: anyhow::Result<()>, path: &std::path::Path) {
        match result {
            Ok(()) => {
                self.status_message = format!("Saved {}", path.display());
                self.error_message.clear();
            }
            Err(err) => {
                self.error_message = format!("Export failed: {:#}", err);
                self.status_message.clear();
            }
        }
    }

    fn inputs_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            let mut refetch = false;

            ui.label("Year:");
            refetch |= ui
                .add(egui::DragValue::new(&mut self.query.year).range(1950..=2100))
                .changed();

            ui.separator();
            ui.label("Ages:");
            refetch |= ui
                .add(egui::DragValue::new(&mut self.query.ages.min).range(0..=100))
                .changed();
            ui.label("to");
            refetch |= ui
                .add(egui::DragValue::new(&mut self.query.ages.max).range(0..=100))
                .changed();

            ui.separator();
            ui.label("Search:");
            ui.add(egui::TextEdit::singleline(&mut self.search).desired_width(160.0))
                .on_hover_text("Case-insensitive part of a country name");

            ui.separator();
            egui::ComboBox::from_id_salt("sort")
                .selected_text(self.sort.label())
                .show_ui(ui, |ui| {
                    for mode in SortMode::MENU {
                        ui.selectable_value(&mut self.sort, mode, mode.label());
                    }
                });

            egui::ComboBox::from_id_salt("locale")
                .selected_text(&self.locale)
                .show_ui(ui, |ui| {
                    for tag in ["en", "de", "fr", "es", "it"] {
                        ui.selectable_value(&mut self.locale, tag.to_string(), tag);
                    }
                });

            if refetch {
                self.fetch_table();
            }
        });
    }

    fn table_ui(&mut self, ui: &mut egui::Ui, countries: &[CountrySummary]) {
        let view = ViewInput::new(self.search.as_str(), self.sort).apply(countries);
        let (locale, _) = map_locale(&self.locale);

        ui.horizontal(|ui| {
            stat_card(ui, "Total Population", &format_count(view.stats.total_population, locale));
            stat_card(ui, "Countries", &view.stats.countries.to_string());
            stat_card(ui, "Average Population", &format_count(view.stats.average_population, locale));
        });
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            let rows: Vec<CountrySummary> = view.rows.iter().map(|r| (*r).clone()).collect();
            if ui.button("Export CSV").clicked() {
                self.export_table(&rows, false);
            }
            if ui.button("Export JSON").clicked() {
                self.export_table(&rows, true);
            }
        });
        ui.add_space(6.0);

        if view.rows.is_empty() {
            ui.label("No countries match the current search.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("countries")
                .striped(true)
                .num_columns(4)
                .show(ui, |ui| {
                    ui.strong("Country");
                    ui.strong("Population");
                    ui.strong("Male");
                    ui.strong("Female");
                    ui.end_row();

                    for r in &view.rows {
                        let selected = self.selected.as_deref() == Some(r.code.as_str());
                        if ui.selectable_label(selected, &r.country).clicked() {
                            clicked = Some(r.code.clone());
                        }
                        ui.label(format_count(r.population, locale));
                        ui.label(&r.male);
                        ui.label(&r.female);
                        ui.end_row();
                    }
                });
        });
        if let Some(code) = clicked {
            self.fetch_detail(code);
        }
    }

    fn detail_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Country detail");
            if ui.small_button("✕").clicked() {
                self.selected = None;
                self.detail.clear();
            }
        });
        ui.separator();

        if self.detail_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading...");
            });
            return;
        }

        match self.detail.get() {
            Some(DetailState::Ready(detail)) => {
                let Some(last) = summarize::latest(&detail.series) else {
                    return;
                };
                let (locale, _) = map_locale(&self.locale);
                ui.label(egui::RichText::new(&last.country).size(20.0).strong());
                ui.label(format!("{} · {}", last.code, last.year));
                ui.add_space(6.0);
                ui.label(format!("Population: {}", format_count(last.population, locale)));
                ui.add(
                    egui::ProgressBar::new((last.male / 100.0) as f32)
                        .text(format!("Male {:.1}%", last.male)),
                );
                ui.add(
                    egui::ProgressBar::new((last.female / 100.0) as f32)
                        .text(format!("Female {:.1}%", last.female)),
                );
                if let Some(first) = detail.series.first() {
                    ui.label(format!(
                        "{} years of data, {}–{}",
                        detail.series.len(),
                        first.year,
                        last.year
                    ));
                }
                ui.add_space(8.0);
                ui.horizontal_wrapped(|ui| {
                    for (label, what) in [
                        ("Series CSV", DetailExport::SeriesCsv),
                        ("Series JSON", DetailExport::SeriesJson),
                        ("Population chart", DetailExport::SeriesChart),
                        ("Age chart", DetailExport::AgeChart),
                    ] {
                        if ui.button(label).clicked() {
                            self.export_detail(&detail, what);
                        }
                    }
                });
            }
            Some(DetailState::NotFound(code)) => {
                ui.colored_label(egui::Color32::GRAY, format!("Country {} not found.", code));
            }
            None => {
                ui.label("Select a country in the table.");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DetailExport {
    SeriesCsv,
    SeriesJson,
    SeriesChart,
    AgeChart,
}

fn save_dialog(file_name: &str, ext: &str) -> Option<PathBuf> {
    let start = dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    rfd::FileDialog::new()
        .set_directory(start)
        .set_file_name(file_name)
        .add_filter(ext.to_ascii_uppercase(), &[ext])
        .save_file()
}

fn stat_card(ui: &mut egui::Ui, title: &str, value: &str) {
    ui.group(|ui| {
        ui.vertical(|ui| {
            ui.label(egui::RichText::new(title).small());
            ui.label(egui::RichText::new(value).size(18.0).strong());
        });
    });
}

impl eframe::App for IdbApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();

        // Keep polling while a worker is outstanding
        if self.table_loading() || self.detail_loading() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("inputs").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading("World Population Dashboard");
            self.inputs_ui(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            if !self.status_message.is_empty() {
                ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
            } else {
                ui.label("Source: U.S. Census Bureau, International Database");
            }
        });

        if self.selected.is_some() {
            egui::SidePanel::right("detail")
                .resizable(true)
                .default_width(320.0)
                .show(ctx, |ui| self.detail_ui(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.error_message.is_empty() {
                egui::Frame::none()
                    .fill(egui::Color32::from_rgb(253, 236, 234))
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.colored_label(egui::Color32::RED, &self.error_message);
                        if ui.button("Retry").clicked() {
                            self.fetch_table();
                        }
                    });
                return;
            }

            if self.table_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Fetching population data...");
                });
                return;
            }

            match self.table.get() {
                Some(TableState::Ready(countries)) => self.table_ui(ui, &countries),
                Some(TableState::Failed(_)) | None => {
                    ui.label("No data loaded.");
                }
            }
        });
    }
}
