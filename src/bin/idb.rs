use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use idb_rs::api::{DEFAULT_YEAR, HISTORY_YEARS};
use idb_rs::config::{API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL};
use idb_rs::summarize::{self, Summarized};
use idb_rs::viz::util::{format_count, map_locale};
use idb_rs::{AgeRange, Client, ClientConfig, IdbError, QueryInput, SortMode, ViewInput, YearSpec};
use idb_rs::{stats, storage, viz};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "idb",
    version,
    about = "Fetch, summarize, export & chart U.S. Census International Database population data"
)]
struct Cli {
    /// Census API key (optional for small request volumes).
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    key: Option<String>,
    /// IDB endpoint.
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Population of every country for one year (the dashboard table).
    Countries(CountriesArgs),
    /// History of one country (the detail view).
    Country(CountryArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct CountriesArgs {
    /// Year (YYYY).
    #[arg(short, long, default_value_t = DEFAULT_YEAR)]
    year: i32,
    /// Inclusive age range MIN:MAX.
    #[arg(short, long, default_value = "0:100")]
    ages: AgeRange,
    /// Case-insensitive substring of the country name.
    #[arg(short, long, default_value = "")]
    search: String,
    /// population|male|female|country followed by -asc or -desc.
    #[arg(long, default_value = "population-desc")]
    sort: String,
    /// Print at most N rows.
    #[arg(long)]
    limit: Option<usize>,
    /// Save the filtered, sorted table (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Print total population, country count and average.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Number formatting locale (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
}

#[derive(Args, Debug)]
struct CountryArgs {
    /// GENC country code, e.g. NO or USA.
    code: String,
    /// Year (YYYY) or range (YYYY:YYYY).
    #[arg(long, default_value_t = HISTORY_YEARS.to_query_param())]
    years: String,
    /// Save the yearly series (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Population/gender chart (.svg or .png).
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Age distribution chart (.svg or .png).
    #[arg(long)]
    age_plot: Option<PathBuf>,
    /// Save the age distribution as CSV.
    #[arg(long)]
    ages_out: Option<PathBuf>,
    #[arg(long, default_value_t = 1000)]
    width: u32,
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Print series statistics.
    #[arg(long, default_value_t = false)]
    stats: bool,
    #[arg(long, default_value = "en")]
    locale: String,
}

fn output_format(format: Option<OutFormat>, path: &Path) -> Result<OutFormat> {
    if let Some(f) = format {
        return Ok(f);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Ok(OutFormat::Csv),
        "json" => Ok(OutFormat::Json),
        other => bail!("unsupported format: {}", other),
    }
}

fn log_coercions<T>(what: &str, s: &Summarized<T>) {
    if !s.coercions.is_clean() {
        warn!(
            "{}: {} malformed cells counted as 0, {} rows dropped, {} rows with unknown sex",
            what, s.coercions.defaulted_cells, s.coercions.dropped_rows, s.coercions.unknown_sex
        );
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = ClientConfig::default()
        .with_base_url(cli.base_url)
        .with_api_key(cli.key);
    let client = Client::new(&config)?;
    match cli.cmd {
        Command::Countries(args) => cmd_countries(&client, args),
        Command::Country(args) => cmd_country(&client, args),
    }
}

fn cmd_countries(client: &Client, args: CountriesArgs) -> Result<()> {
    let sort = SortMode::parse_or_fallback(&args.sort);
    if args.sort.parse::<SortMode>().is_err() {
        warn!("unknown sort mode {:?}, using {}", args.sort, sort);
    }

    let query = QueryInput { year: args.year, ages: args.ages };
    let table = client
        .fetch_table(&query.to_query())
        .with_context(|| format!("fetching populations for {}", args.year))?;
    let summarized = summarize::summarize_countries_report(&table);
    log_coercions("countries", &summarized);
    let countries = summarized.records;
    info!("{} countries for {}", countries.len(), args.year);

    let view = ViewInput::new(args.search.as_str(), sort).apply(&countries);
    let (locale, _) = map_locale(&args.locale);

    if let Some(path) = args.out.as_ref() {
        let rows: Vec<_> = view.rows.iter().map(|r| (*r).clone()).collect();
        match output_format(args.format, path)? {
            OutFormat::Csv => storage::save_countries_csv(&rows, path)?,
            OutFormat::Json => storage::save_json(&rows, path)?,
        }
        eprintln!("Saved {} rows to {}", rows.len(), path.display());
    }

    if args.stats {
        println!(
            "Total population: {}  Countries: {}  Average: {}",
            format_count(view.stats.total_population, locale),
            view.stats.countries,
            format_count(view.stats.average_population, locale)
        );
    }

    if view.rows.is_empty() {
        eprintln!("No countries match {:?}", args.search);
        return Ok(());
    }

    let width = view
        .rows
        .iter()
        .map(|r| r.country.chars().count())
        .max()
        .unwrap_or(0)
        .max("Country".len());
    println!(
        "{:<width$}  {:<4}  {:>15}  {:>7}  {:>7}",
        "Country", "Code", "Population", "Male", "Female"
    );
    for r in view.rows.iter().take(args.limit.unwrap_or(usize::MAX)) {
        println!(
            "{:<width$}  {:<4}  {:>15}  {:>7}  {:>7}",
            r.country,
            r.code,
            format_count(r.population, locale),
            r.male,
            r.female
        );
    }
    Ok(())
}

fn not_found(code: &str, err: &IdbError) -> anyhow::Error {
    info!("detail fetch for {} failed: {}", code, err);
    anyhow::anyhow!("country {} not found ({})", code.trim(), err)
}

fn cmd_country(client: &Client, args: CountryArgs) -> Result<()> {
    let years: YearSpec = args.years.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let table = client
        .fetch_history(&args.code, years)
        .map_err(|e| not_found(&args.code, &e))?;

    let summarized = summarize::summarize_series_report(&table);
    log_coercions("series", &summarized);
    let series = summarized.records;
    let Some(latest) = summarize::latest(&series) else {
        return Err(not_found(
            &args.code,
            &IdbError::NoData(format!("{} ({})", args.code, years.to_query_param())),
        ));
    };

    let (locale, _) = map_locale(&args.locale);
    println!("{} ({}), {}", latest.country, latest.code, latest.year);
    println!("  Population: {}", format_count(latest.population, locale));
    println!("  Male:       {:.1}%", latest.male);
    println!("  Female:     {:.1}%", latest.female);

    if let Some(path) = args.out.as_ref() {
        match output_format(args.format, path)? {
            OutFormat::Csv => storage::save_series_csv(&series, path)?,
            OutFormat::Json => storage::save_json(&series, path)?,
        }
        eprintln!("Saved {} rows to {}", series.len(), path.display());
    }

    if let Some(path) = args.plot.as_ref() {
        viz::plot_series(&series, path, args.width, args.height, &args.locale)?;
        eprintln!("Wrote plot to {}", path.display());
    }

    if args.age_plot.is_some() || args.ages_out.is_some() {
        let ages = summarize::age_distribution_report(&table);
        log_coercions("ages", &ages);
        if let Some(path) = args.ages_out.as_ref() {
            storage::save_ages_csv(&ages.records, path)?;
            eprintln!("Saved {} age buckets to {}", ages.records.len(), path.display());
        }
        if let Some(path) = args.age_plot.as_ref() {
            let title = format!("{}: population by age, {}", latest.country, years.to_query_param());
            viz::plot_age_distribution(
                &ages.records,
                &title,
                path,
                args.width,
                args.height,
                &args.locale,
            )?;
            eprintln!("Wrote plot to {}", path.display());
        }
    }

    if args.stats {
        let Some(s) = stats::series_stats(&series) else {
            return Ok(());
        };
        let change_pct = s
            .change_pct
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| "NA".to_string());
        println!(
            "{} {}–{}  count={}  min={} max={} mean={} median={}  change={} ({})",
            s.code,
            s.first_year,
            s.last_year,
            s.count,
            format_count(s.min, locale),
            format_count(s.max, locale),
            format_count(s.mean, locale),
            format_count(s.median, locale),
            format_count(s.change, locale),
            change_pct
        );
    }

    Ok(())
}
