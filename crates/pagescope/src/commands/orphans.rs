use super::Context;

pub async fn run() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;
    let orphans = store.orphans().await?;

    if orphans.is_empty() {
        println!("No orphaned session files");
        return Ok(());
    }

    println!("Orphaned session files: {}", orphans.len());
    for path in &orphans {
        println!("  {}", path.display());
    }
    println!("\nThese bodies have no index entry and are not loaded.");
    Ok(())
}
