//! tripcast - Weather reports for trip planning
//!
//! Fetches current conditions and 5-day forecasts for the requested
//! locations concurrently and prints a plain-text report for each.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tripcast::cache::WeatherCache;
use tripcast::cli::{Cli, StartupConfig};
use tripcast::config::WeatherConfig;
use tripcast::data::{CurrentConditions, DailyForecast, Location, WeatherReport};
use tripcast::service::WeatherService;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let config = WeatherConfig::from_env();
    if !config.api_key_valid() {
        eprintln!("warning: API key looks missing or malformed, set TRIPCAST_API_KEY");
    }

    let cache = match &startup.cache_dir {
        Some(dir) => WeatherCache::open(dir),
        None => match WeatherCache::open_default() {
            Some(cache) => cache,
            None => WeatherCache::open(&std::env::temp_dir().join("tripcast")),
        },
    };

    let service = match WeatherService::new(config, cache) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut any_data = false;

    if startup.current_only {
        let fetches = startup
            .locations
            .iter()
            .map(|location| service.current_weather(location, startup.use_retry));
        let results = futures::future::join_all(fetches).await;

        for (location, result) in startup.locations.iter().zip(results) {
            print_header(location);
            match result {
                Ok(conditions) => {
                    print_current(&conditions);
                    any_data = true;
                }
                Err(e) => println!("  {}", e),
            }
        }
    } else {
        let fetches = startup
            .locations
            .iter()
            .map(|location| service.weather_data(location));
        let reports = futures::future::join_all(fetches).await;

        for (location, report) in startup.locations.iter().zip(reports) {
            print_header(location);
            if print_report(&report) {
                any_data = true;
            }
        }
    }

    if any_data {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_header(location: &Location) {
    println!("=== {} ===", location);
}

fn print_current(conditions: &CurrentConditions) {
    println!(
        "  Now: {:.1}\u{b0}C (feels like {:.1}\u{b0}C), {}",
        conditions.temperature, conditions.feels_like, conditions.description
    );
    println!(
        "       humidity {}%, wind {:.1} m/s",
        conditions.humidity, conditions.wind_speed
    );
}

fn print_forecast(days: &[DailyForecast]) {
    for day in days {
        println!(
            "  {} {}  {:>3}\u{b0}/{:>3}\u{b0}  rain {:>3}%  wind {:>3} km/h  {}",
            day.weekday, day.date, day.high, day.low, day.precipitation, day.wind_kmh, day.description
        );
    }
}

/// Prints one combined report. Returns whether any usable data was shown.
fn print_report(report: &WeatherReport) -> bool {
    match report {
        WeatherReport::Data(bundle) => {
            let mut any = false;
            match &bundle.current {
                Ok(conditions) => {
                    print_current(conditions);
                    any = true;
                }
                Err(e) => println!("  Current conditions unavailable: {}", e),
            }
            match &bundle.forecast {
                Ok(days) if !days.is_empty() => {
                    print_forecast(days);
                    any = true;
                }
                Ok(_) => println!("  No forecast data returned"),
                Err(e) => println!("  Forecast unavailable: {}", e),
            }
            any
        }
        WeatherReport::NotFound { query, alternatives } => {
            println!("  Location '{}' not found. Did you mean:", query);
            for alt in alternatives {
                match &alt.state {
                    Some(state) => println!(
                        "    {}, {}, {} ({:.2}, {:.2})",
                        alt.name, state, alt.country, alt.lat, alt.lon
                    ),
                    None => println!(
                        "    {}, {} ({:.2}, {:.2})",
                        alt.name, alt.country, alt.lat, alt.lon
                    ),
                }
            }
            false
        }
        WeatherReport::Failed(e) => {
            println!("  {}", e);
            false
        }
    }
}
