use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use tfl_catalogue::catalogue::CatalogueFetcher;
use tfl_catalogue::model::{Mode, StopPoint};
use tfl_catalogue::store::EntityStore;
use tfl_catalogue::tfl::{RateLimitConfig, RateLimited, TflClient, TflConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Get credentials from environment
    let app_id = std::env::var("TFL_APP_ID").unwrap_or_else(|_| {
        eprintln!("Warning: TFL_APP_ID not set. API calls will fail.");
        String::new()
    });
    let app_key = std::env::var("TFL_APP_KEY").unwrap_or_else(|_| {
        eprintln!("Warning: TFL_APP_KEY not set. API calls will fail.");
        String::new()
    });

    let mode: Mode = match std::env::args().nth(1).as_deref().unwrap_or("bus").parse() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let data_dir = PathBuf::from("data");

    // One rate-limited client for the whole run
    let config = TflConfig::new(app_id, app_key);
    let client = TflClient::new(config).expect("Failed to create TfL client");
    let transport = RateLimited::new(client, RateLimitConfig::default());

    let fetcher = CatalogueFetcher::new(transport, mode, &data_dir);

    let mut stop_points: EntityStore<StopPoint> =
        EntityStore::new(data_dir.join("stoppoints.json"));
    stop_points
        .load()
        .expect("Failed to load stop-point snapshot");

    let mut line_store = fetcher.store();
    let result = line_store
        .load_or_fetch(|| fetcher.fetch(&mut stop_points))
        .await;

    match result {
        Ok(true) => println!("Loaded {mode} catalogue from snapshot."),
        Ok(false) => println!("Fetched {mode} catalogue from TfL."),
        Err(e) => {
            eprintln!("Catalogue fetch failed: {e}");
            eprintln!("Partial progress, if any, was checkpointed; rerun to resume.");
            std::process::exit(1);
        }
    }

    line_store
        .write_json(data_dir.join(format!("lines-{mode}-export.json")))
        .expect("Failed to write line export");
    stop_points
        .write_json(data_dir.join("stoppoints-export.json"))
        .expect("Failed to write stop-point export");

    println!(
        "{} lines, {} stop points.",
        line_store.len(),
        stop_points.len()
    );
}
