//! RuralHealth: risk screening for community health workers.
//!
//! Command-line entry point. JSON documents are read from a file path or
//! `-` for stdin; results are printed to stdout as JSON.
//!
//! ```text
//! ruralhealth assess <input.json|->         Score without storing
//! ruralhealth register <profile.json|-> [--by <worker_id>]
//! ruralhealth screen <request.json|->       Score, store and enrich
//! ruralhealth history <patient_id> [--risk <Low|Medium|High>]
//! ruralhealth recommendations <patient_id> [--open]
//! ruralhealth complete <recommendation_id>
//! ruralhealth update-patient <patient_id> <profile.json|->
//! ruralhealth schedule <appointment.json|-> --by <worker_id>
//! ruralhealth appointments [<patient_id>] [--status <status>] [--upcoming]
//! ruralhealth update-appointment <appointment_id> <update.json|->
//! ```

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ruralhealth::adapters::insights::TemplateInsights;
use ruralhealth::adapters::sanitize::SanitizingMakeWriter;
use ruralhealth::adapters::sqlite::SqliteStorage;
use ruralhealth::application::ScreeningService;
use ruralhealth::config::{AppConfig, LogMode};
use ruralhealth::domain::{
    AppointmentRequest, AppointmentStatus, AppointmentUpdate, PatientProfile, RiskLevel,
    ScreeningRequest,
};
use ruralhealth::ports::{AppointmentFilter, RecommendationFilter, ScreeningFilter};
use ruralhealth::ScreeningInput;

const USAGE: &str = "usage: ruralhealth <assess|register|update-patient|screen|history|recommendations|complete|schedule|appointments|update-appointment> [args]";

const VALUE_FLAGS: [&str; 3] = ["--by", "--risk", "--status"];

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Stdout carries command output, so logs go to stderr or a file.
    let (writer, _guard) = match config.log_mode {
        LogMode::File => {
            let file = config
                .open_log_file()
                .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let storage = Arc::new(
        SqliteStorage::new(&config.db_path)
            .with_context(|| format!("Failed to open database {:?}", config.db_path))?,
    );
    let insights = Arc::new(TemplateInsights::new(config.insights.clone()));
    let service = ScreeningService::new(storage, insights);

    match command.as_str() {
        "assess" => {
            let input: ScreeningInput = read_json(positional(rest, 0, "input")?)?;
            print_json(&service.assess(&input)?)
        }
        "register" => {
            let profile: PatientProfile = read_json(positional(rest, 0, "profile")?)?;
            let registered_by = flag_value(rest, "--by");
            print_json(&service.register_patient(profile, registered_by)?)
        }
        "update-patient" => {
            let patient_id = positional(rest, 0, "patient_id")?;
            let profile: PatientProfile = read_json(positional(rest, 1, "profile")?)?;
            print_json(&service.update_patient(patient_id, profile)?)
        }
        "screen" => {
            let request: ScreeningRequest = read_json(positional(rest, 0, "request")?)?;
            print_json(&service.create_screening(&request.patient_id, request.input)?)
        }
        "history" => {
            let patient_id = positional(rest, 0, "patient_id")?;
            service.patient(patient_id)?;
            let mut filter = ScreeningFilter::for_patient(patient_id);
            if let Some(level) = flag_value(rest, "--risk") {
                let level: RiskLevel = level.parse().map_err(anyhow::Error::msg)?;
                filter = filter.with_risk_level(level);
            }
            print_json(&service.screenings(&filter)?)
        }
        "recommendations" => {
            let filter = RecommendationFilter {
                patient_id: Some(positional(rest, 0, "patient_id")?.to_string()),
                incomplete_only: rest.iter().any(|a| a == "--open"),
                ..Default::default()
            };
            print_json(&service.recommendations(&filter)?)
        }
        "complete" => {
            service.complete_recommendation(positional(rest, 0, "recommendation_id")?)?;
            Ok(())
        }
        "schedule" => {
            let request: AppointmentRequest = read_json(positional(rest, 0, "appointment")?)?;
            let Some(worker) = flag_value(rest, "--by") else {
                bail!("schedule requires --by <worker_id>");
            };
            print_json(&service.schedule_appointment(request, &worker)?)
        }
        "appointments" => {
            let mut filter = AppointmentFilter {
                patient_id: positionals(rest).first().map(|id| (*id).to_string()),
                ..Default::default()
            };
            if let Some(status) = flag_value(rest, "--status") {
                let status: AppointmentStatus = status.parse().map_err(anyhow::Error::msg)?;
                filter = filter.with_status(status);
            }
            if rest.iter().any(|a| a == "--upcoming") {
                filter = filter.upcoming_from(chrono::Utc::now());
            }
            print_json(&service.appointments(&filter)?)
        }
        "update-appointment" => {
            let appointment_id = positional(rest, 0, "appointment_id")?;
            let update: AppointmentUpdate = read_json(positional(rest, 1, "update")?)?;
            print_json(&service.update_appointment(appointment_id, update)?)
        }
        other => bail!("Unknown command '{other}'\n{USAGE}"),
    }
}

/// Arguments that are neither flags nor a flag's value.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut found = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            found.push(arg.as_str());
        }
    }
    found
}

fn positional<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    match positionals(args).get(index) {
        Some(arg) => Ok(*arg),
        None => bail!("Missing <{name}> argument\n{USAGE}"),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn read_json<T: DeserializeOwned>(source: &str) -> Result<T> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {source}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {source}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
