use anyhow::Context;
use std::path::PathBuf;
use vaultsync_core::SeedVault;

fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo_seed.toml"));

    let seed = SeedVault::demo();
    let content = seed.to_toml().context("Failed to serialize demo seed")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write seed file: {}", path.display()))?;

    println!(
        "Created {} with {} categories and {} entries",
        path.display(),
        seed.categories.len(),
        seed.entries.len()
    );
    Ok(())
}
