use anyhow::Result;
use paper_order::config::write_default_config;
use std::path::Path;
use tracing::info;

pub fn run(path: &Path) -> Result<()> {
    write_default_config(path)?;
    info!(path = %path.display(), "wrote default config");
    Ok(())
}
