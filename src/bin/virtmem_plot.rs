use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use virtmem_plot::generate_charts;
use virtmem_plot::plot::parse_cli;

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let (csvin, outdir) = parse_cli();
    info!(
        "read data from {} and plot to {}",
        csvin.display(),
        outdir.display()
    );
    let written = generate_charts(&csvin, &outdir)?;
    info!("done, {} chart(s) written", written.len());
    Ok(())
}
