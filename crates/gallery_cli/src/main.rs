//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `gallery_core` linkage.
//! - Optionally open a configured catalog, import a seed and print counts.
//!
//! Usage: `gallery_cli [config.json [seed.json]]`

use gallery_core::db::open_db;
use gallery_core::{
    import_seed_file, init_logging, load_config, CatalogService, GalleryQuery,
    SqliteCatalogRepository,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("gallery_core ping={}", gallery_core::ping());
    println!("gallery_core version={}", gallery_core::core_version());

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(config_path) = args.first() else {
        return ExitCode::SUCCESS;
    };

    match print_catalog_stats(config_path, args.get(1).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_catalog_stats(config_path: &str, seed_path: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path)?;
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(config.effective_log_level(), &log_dir.to_string_lossy())?;
    }

    let db_path = config
        .db_path
        .clone()
        .ok_or("config has no db_path")?;
    let mut conn = open_db(&db_path)?;

    if let Some(seed_path) = seed_path {
        let report = import_seed_file(&mut conn, seed_path)?;
        println!(
            "seed items={} archetypes_created={} archetypes_existing={}",
            report.items_upserted, report.archetypes_created, report.archetypes_existing
        );
    }

    let service = CatalogService::with_config(SqliteCatalogRepository::new(&conn), config);
    let catalog = service.list_archetypes();
    let first_page = service.list_items(&GalleryQuery::default())?;
    println!("catalog items={}", service.count_items()?);
    println!(
        "catalog archetypes={} degraded={}",
        catalog.archetypes.len(),
        catalog.degraded
    );
    println!(
        "first_page items={} page_size={} has_more={}",
        first_page.items.len(),
        first_page.page_size,
        first_page.has_more
    );
    Ok(())
}
