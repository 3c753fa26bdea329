use pagescope_core::Config;
use pagescope_telemetry::Paths;

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let created = init_at(&paths)?;

    println!("✓ Data directory: {}", paths.home().display());
    if created {
        println!("✓ Wrote default config to {}", paths.config_file().display());
    } else {
        println!("  Existing config kept at {}", paths.config_file().display());
    }
    Ok(())
}

/// Create the directory layout; returns whether a config was written
fn init_at(paths: &Paths) -> anyhow::Result<bool> {
    std::fs::create_dir_all(paths.sessions_dir())?;

    let config_path = paths.config_file();
    if config_path.exists() {
        // Fail loudly on a config we could not read later
        Config::load(&config_path)?;
        return Ok(false);
    }
    Config::default().save(&config_path)?;
    Ok(true)
}
