use crate::config::Config;
use crate::display::*;
use crate::engine::Engine;
use crate::manual::ManualAssignRequest;
use crate::model::{AcademicYear, AcademicYearId, AcademicYearUpdate, FacultyId, Principal, Role};
use crate::store::Store;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use eyre::WrapErr;
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;

mod activity;
mod algos;
mod checks;
mod config;
mod coordinator;
mod display;
mod engine;
mod error;
mod load;
mod manual;
mod model;
mod singleton;
mod stats;
mod store;

#[derive(Parser)]
#[command(version, about = "Assign faculty guides to student project groups")]
struct Args {
    /// Use FILE instead of rguide.toml
    #[arg(short, long, value_name = "FILE", default_value = "rguide.toml", global = true)]
    config: PathBuf,
    /// Set verbosity level
    #[arg(short, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Identifier of the caller, recorded in the activity log
    #[arg(long, global = true)]
    actor: Option<String>,
    /// Role of the caller
    #[arg(long, value_enum, default_value = "admin", global = true)]
    role: Role,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the tables if they do not exist
    Init,
    /// Show the load of every faculty member
    Loads,
    /// Look for inconsistencies in the stored data
    Check,
    /// Assign guides to every proposed project without one
    AutoAssign {
        /// Do not write back results to database
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Plan again from fresh state up to this many times
        #[arg(long, default_value_t = 1)]
        attempts: u32,
    },
    /// Set or remove the guide of a project
    Assign {
        #[arg(long)]
        project: Option<String>,
        /// Faculty member id, or "none" to remove the guide
        #[arg(long)]
        guide: Option<String>,
    },
    /// Update an academic year, possibly making it the current one
    SetYear {
        #[arg(long)]
        year: Option<i64>,
        #[arg(long, action = ArgAction::Set)]
        current: Option<bool>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Create an academic year
    CreateYear {
        #[arg(long)]
        year: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        current: bool,
    },
    /// Delete an academic year
    DeleteYear {
        #[arg(long)]
        year: i64,
    },
    /// Delete a faculty member, keeping the projects they guide
    DeleteFaculty {
        #[arg(long)]
        faculty: i64,
    },
}

/// Keep the status class of engine errors in the report.
fn failed(what: &'static str) -> impl FnOnce(error::Error) -> eyre::Report {
    move |e| {
        let status = e.status();
        eyre::Report::new(e).wrap_err(format!("{what} failed (status {status})"))
    }
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(&args.config)?;
    let mut store = Store::new(&config.database.url)
        .await
        .wrap_err("cannot connect to database")?;
    let principal = args.actor.map(|id| Principal {
        id,
        role: args.role,
    });
    let mut engine = Engine::new(&mut store, principal, config.notifications.enabled);
    let mutated = match args.command {
        Command::Init => {
            engine
                .create_schema()
                .await
                .wrap_err("cannot create database schema")?;
            false
        }
        Command::Loads => {
            let (faculty, loads) = engine.loads().await?;
            if args.json {
                print_json(&loads)?;
            } else {
                display_loads(&faculty, &loads);
            }
            false
        }
        Command::Check => {
            let findings = engine.check().await?;
            if args.json {
                print_json(&findings)?;
            } else {
                display_findings(&findings);
            }
            false
        }
        Command::AutoAssign { dry_run, attempts } => {
            let report = engine
                .auto_assign_with_attempts(dry_run, attempts.max(1))
                .await
                .map_err(failed("automatic assignment"))?;
            if args.json {
                print_json(&report)?;
            } else {
                let (faculty, _) = engine.loads().await?;
                display_report(&report, &faculty);
            }
            report.committed
        }
        Command::Assign { project, guide } => {
            let request = ManualAssignRequest {
                project_id: project,
                guide_id: guide,
            };
            let project = engine
                .manual_assign(&request)
                .await
                .map_err(failed("manual assignment"))?;
            if args.json {
                print_json(&project)?;
            } else {
                display_project(&project);
            }
            true
        }
        Command::SetYear {
            year,
            current,
            name,
            slug,
            start,
            end,
        } => {
            let update = AcademicYearUpdate {
                id: year.map(AcademicYearId),
                is_current: current,
                name,
                slug,
                start,
                end,
            };
            let year = engine
                .set_academic_year(&update)
                .await
                .map_err(failed("academic year update"))?;
            if args.json {
                print_json(&year)?;
            } else {
                display_year(&year);
            }
            true
        }
        Command::CreateYear {
            year,
            name,
            slug,
            start,
            end,
            current,
        } => {
            let year = AcademicYear {
                id: AcademicYearId(year),
                name,
                slug,
                start,
                end,
                is_current: current,
            };
            let year = engine
                .create_academic_year(&year)
                .await
                .map_err(failed("academic year creation"))?;
            if args.json {
                print_json(&year)?;
            } else {
                display_year(&year);
            }
            true
        }
        Command::DeleteYear { year } => {
            let year = engine
                .delete_academic_year(AcademicYearId(year))
                .await
                .map_err(failed("academic year deletion"))?;
            if args.json {
                print_json(&year)?;
            } else {
                display_year(&year);
            }
            true
        }
        Command::DeleteFaculty { faculty } => {
            let detached = engine
                .delete_faculty(FacultyId(faculty))
                .await
                .map_err(failed("faculty member deletion"))?;
            if args.json {
                print_json(&detached)?;
            } else {
                println!("Projects left without guide: {}", detached.len());
            }
            true
        }
    };
    if mutated {
        checks::report(&engine.check().await?);
    }
    Ok(())
}
