use dotenvy::dotenv;
use showtime_buddy::{
    config::{catalog, database},
    core::{clock::SystemClock, report, session, slot, voucher},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 4. Seed movies and rooms from the catalog file
    let clock = SystemClock;
    let catalog_config = catalog::load_default_config()
        .inspect_err(|e| error!("Critical error loading catalog configuration: {e}"))?;
    catalog::seed_catalog(&db, &clock, &catalog_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;

    // 5. Report what is bookable right now
    let available = slot::find_available(&db, &clock, None, None).await?;
    let vouchers = voucher::find_active_vouchers(&db, &clock).await?;
    info!(
        available_slots = available.len(),
        active_vouchers = vouchers.len(),
        "Showtime core ready"
    );

    for upcoming in session::find_upcoming_sessions(&db, &clock).await? {
        let occupancy = report::session_occupancy_report(&db, upcoming.session.id).await?;
        info!(
            "{} on {}: {}",
            occupancy.session.name,
            occupancy.session.date,
            report::format_occupancy_bar(occupancy.occupancy_percent, None)
        );
        for slot in &occupancy.slots {
            info!("  {}", report::format_slot_summary(slot));
        }
    }

    Ok(())
}
