use super::Context;

pub async fn run() -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;
    let policy = store.policy().clone();
    let report = store.cleanup().await?;

    println!(
        "Retention: {} days, {} sessions max",
        policy.max_age_days, policy.max_sessions
    );
    println!("  Expired: {}", report.expired.len());
    println!("  Over limit: {}", report.overflow.len());
    println!("  Remaining: {}", store.len().await);
    Ok(())
}
