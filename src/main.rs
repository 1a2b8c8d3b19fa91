mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;
mod store;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use datasources::OpenWeatherMapClient;
use error::{HomeKeepError, Result};
use logic::{GenerationOptions, GenerationOutcome, TaskGenerationService};
use models::{EquipmentItem, HomeProfile, HomeType, TaskStatus, TemplateCatalog};
use store::{open_store, AnyStore, MaintenanceStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes priority over -v
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if matches!(cli.command, Some(Commands::Init)) {
        let (_, path) = Config::setup_interactive()?;
        println!("Ready. Config at {}", path.display());
        return Ok(());
    }

    // First run without a config falls through to interactive setup
    let config = if Config::exists(cli.config.as_ref()) {
        Config::load(cli.config.clone())?
    } else {
        let (config, _) = Config::setup_interactive()?;
        config
    };

    let store = open_store(&config, cli.data_dir.as_ref()).await?;

    match cli.command {
        None | Some(Commands::Check) => check(&config, &store).await,
        Some(Commands::Init) => unreachable!("handled above"),
        Some(Commands::Seed) => seed(&store).await,
        Some(Commands::Homes) => homes(&store).await,
        Some(Commands::AddHome {
            name,
            home_type,
            year_built,
            latitude,
            longitude,
            climate,
        }) => {
            add_home(
                &store, name, &home_type, year_built, latitude, longitude, climate,
            )
            .await
        }
        Some(Commands::AddEquipment {
            home,
            equipment_type,
            name,
            next_service,
        }) => add_equipment(&store, home, equipment_type, name, next_service).await,
        Some(Commands::Generate {
            home,
            category,
            max_tasks,
            no_weather,
            look_ahead,
        }) => {
            generate(
                &config, store, home, category, max_tasks, no_weather, look_ahead,
            )
            .await
        }
        Some(Commands::Tasks { home }) => tasks(&store, home).await,
        Some(Commands::Complete { task }) => {
            store.set_task_status(task, TaskStatus::Completed).await?;
            println!("Task {} marked completed", task);
            Ok(())
        }
    }
}

async fn check(config: &Config, store: &AnyStore) -> Result<()> {
    match store {
        AnyStore::Local(db) => {
            println!("Storage: local ({})", db.path().display());
        }
        AnyStore::Postgres(pg) => match pg.test_connection().await {
            Ok(_) => println!("Storage: postgres OK"),
            Err(e) => println!("Storage: postgres OFFLINE ({})", e),
        },
    }

    match &config.openweathermap {
        Some(owm) if owm.enabled => {
            // Probe with the first home that has coordinates
            let probe = store
                .list_homes()
                .await?
                .into_iter()
                .find_map(|h| h.coordinates());
            match probe {
                Some((lat, lon)) => {
                    let client = OpenWeatherMapClient::new(owm.clone());
                    match client.test_connection(lat, lon).await {
                        Ok(true) => println!("OpenWeatherMap: OK"),
                        Ok(false) => println!("OpenWeatherMap: rejected (check API key)"),
                        Err(e) => println!("OpenWeatherMap: OFFLINE ({})", e),
                    }
                }
                None => println!("OpenWeatherMap: configured (no home with coordinates to test)"),
            }
        }
        _ => println!("OpenWeatherMap: not configured"),
    }

    Ok(())
}

async fn seed(store: &AnyStore) -> Result<()> {
    let catalog: TemplateCatalog = serde_yaml::from_str(include_str!("../data/templates.yaml"))
        .map_err(|e| HomeKeepError::InvalidData(format!("Bundled catalog: {}", e)))?;

    let count = catalog.templates.len();
    for rule in &catalog.templates {
        store.upsert_template(rule).await?;
    }
    println!("Seeded {} templates", count);
    Ok(())
}

async fn homes(store: &AnyStore) -> Result<()> {
    let homes = store.list_homes().await?;
    if homes.is_empty() {
        println!("No homes registered. Use `homekeep add-home`.");
        return Ok(());
    }
    for home in homes {
        let id = home.id.unwrap_or_default();
        let built = home
            .year_built
            .map(|y| format!(", built {}", y))
            .unwrap_or_default();
        println!("[{}] {} ({}{})", id, home.name, home.home_type, built);
    }
    Ok(())
}

async fn add_home(
    store: &AnyStore,
    name: String,
    home_type: &str,
    year_built: Option<i32>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    climate: Vec<String>,
) -> Result<()> {
    let home_type = HomeType::from_str(home_type)
        .ok_or_else(|| HomeKeepError::InvalidData(format!("Unknown home type '{}'", home_type)))?;

    let mut home = HomeProfile::new(name, home_type);
    home.year_built = year_built;
    home.latitude = latitude;
    home.longitude = longitude;
    home.climate = if climate.is_empty() {
        None
    } else {
        Some(climate)
    };

    let id = store.create_home(&home).await?;
    println!("Added home [{}] {}", id, home.name);
    Ok(())
}

async fn add_equipment(
    store: &AnyStore,
    home_id: i64,
    equipment_type: String,
    name: String,
    next_service: Option<chrono::NaiveDate>,
) -> Result<()> {
    if store.get_home(home_id).await?.is_none() {
        return Err(HomeKeepError::NotFound(format!("Home {}", home_id)));
    }

    let mut item = EquipmentItem::new(home_id, equipment_type, name);
    item.next_service_due = next_service;

    let id = store.create_equipment(&item).await?;
    println!("Added equipment [{}] {} ({})", id, item.name, item.equipment_type);
    Ok(())
}

async fn generate(
    config: &Config,
    store: AnyStore,
    home_id: i64,
    category: Option<String>,
    max_tasks: Option<usize>,
    no_weather: bool,
    look_ahead: Option<i64>,
) -> Result<()> {
    if store.get_home(home_id).await?.is_none() {
        return Err(HomeKeepError::NotFound(format!("Home {}", home_id)));
    }

    let options = GenerationOptions {
        weather_optimization: config.generation.weather_optimization && !no_weather,
        max_tasks_per_pass: max_tasks.unwrap_or(config.generation.max_tasks_per_pass),
        prioritize_overdue: config.generation.prioritize_overdue,
        look_ahead_days: look_ahead.unwrap_or(config.generation.look_ahead_days),
    };

    let forecast = config
        .openweathermap
        .as_ref()
        .filter(|owm| owm.enabled && options.weather_optimization)
        .map(|owm| OpenWeatherMapClient::new(owm.clone()));

    let mut service = TaskGenerationService::new(store, forecast);

    let outcome = match category {
        Some(category) => {
            service
                .generate_for_category(home_id, &category, options.max_tasks_per_pass)
                .await
        }
        None => service.generate_for_home(home_id, &options).await,
    };

    match &outcome {
        GenerationOutcome::Completed(tasks) if tasks.is_empty() => {
            println!("Nothing to do: no new tasks within the horizon.");
        }
        GenerationOutcome::Completed(tasks) => {
            println!("Generated {} task(s):", tasks.len());
            for task in tasks {
                println!(
                    "  [{}] {} (due {}, priority {})",
                    task.id.unwrap_or_default(),
                    task.title,
                    task.due_date,
                    task.priority
                );
            }
        }
        GenerationOutcome::Failed(message) => {
            return Err(HomeKeepError::InvalidData(message.clone()));
        }
    }

    Ok(())
}

async fn tasks(store: &AnyStore, home_id: i64) -> Result<()> {
    let tasks = store.list_tasks(home_id).await?;
    if tasks.is_empty() {
        println!("No tasks for home {}. Run `homekeep generate {}`.", home_id, home_id);
        return Ok(());
    }
    for task in tasks {
        let marker = match task.status {
            TaskStatus::Completed => "x",
            TaskStatus::Skipped => "-",
            TaskStatus::InProgress => ">",
            TaskStatus::Pending => " ",
        };
        println!(
            "[{}] [{}] {} (due {}, priority {}, {})",
            marker,
            task.id.unwrap_or_default(),
            task.title,
            task.due_date,
            task.priority,
            task.category
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::Database;

    #[tokio::test]
    async fn generate_reports_missing_home_as_not_found() {
        let config = Config::default();
        let store = AnyStore::Local(Database::open_in_memory().unwrap());

        let err = generate(&config, store, 999, None, None, true, None)
            .await
            .unwrap_err();

        assert!(matches!(err, HomeKeepError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Home 999");
    }
}
