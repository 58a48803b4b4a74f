//! Prints ranked reminders from a herd database.
//!
//! Usage: `farmstead_cli <db-path> <farm-uuid> [days-ahead]`
//!
//! Prints one line per reminder, most urgent first. Set
//! `FARMSTEAD_LOG_DIR` to an absolute path to enable file logging and
//! `FARMSTEAD_CONFIG` to a JSON engine config to override defaults.

use farmstead_core::db::open_db;
use farmstead_core::{
    default_log_level, init_logging, EngineConfig, ReminderQuery, Scope, SqliteAnimalDirectory,
    SqliteVaccinationStore, VaccinationService,
};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let [db_path, farm_id, rest @ ..] = args.as_slice() else {
        return Err("usage: farmstead_cli <db-path> <farm-uuid> [days-ahead]".to_string());
    };
    let farm_id = Uuid::parse_str(farm_id).map_err(|err| format!("invalid farm id: {err}"))?;
    let days_ahead = rest
        .first()
        .map(|value| value.parse::<i64>())
        .transpose()
        .map_err(|err| format!("invalid days-ahead: {err}"))?;

    if let Ok(log_dir) = std::env::var("FARMSTEAD_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let directory = SqliteAnimalDirectory::try_new(&conn).map_err(|err| err.to_string())?;
    let store = SqliteVaccinationStore::try_new(&conn).map_err(|err| err.to_string())?;
    let config = match std::env::var("FARMSTEAD_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(&path).map_err(|err| err.to_string())?,
        Err(_) => EngineConfig::default(),
    };
    let service = VaccinationService::new(directory, store).with_config(config);

    let mut query = ReminderQuery::new(Scope::Farm(farm_id));
    query.days_ahead = days_ahead;
    let report = service.get_reminders(&query).map_err(|err| err.to_string())?;

    for reminder in &report.reminders {
        println!(
            "{:?}\t{:?}\t{}\t{}\t{}\t{}d",
            reminder.priority,
            reminder.reminder_type,
            reminder.animal_tag,
            reminder.vaccination_type,
            reminder.scheduled_date.format("%Y-%m-%d"),
            reminder.days_until_due
        );
    }
    log::info!(
        "event=cli_reminders module=cli status=ok farm_id={farm_id} reminders={}",
        report.summary.total
    );
    println!(
        "total={} overdue={} due_soon={} upcoming={} estimated_cost={:.2}",
        report.summary.total,
        report.summary.overdue,
        report.summary.due_soon,
        report.summary.upcoming,
        report.summary.total_estimated_cost
    );
    Ok(())
}
