use super::{find_session, Context};

pub async fn run(id: &str) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;

    // Prefixes resolve against loaded sessions; a full id also clears orphans
    let target = match find_session(&store, id).await {
        Ok(session) => session.id,
        Err(_) => id.to_string(),
    };

    if store.delete(&target).await? {
        println!("✓ Deleted session {}", target);
    } else {
        println!("No session with id {}", id);
    }
    Ok(())
}
