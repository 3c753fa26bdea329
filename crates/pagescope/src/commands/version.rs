pub fn run() -> anyhow::Result<()> {
    println!("pagescope {}", env!("CARGO_PKG_VERSION"));
    println!("Page load timing, scoring, and third-party attribution");
    Ok(())
}
