mod args;
mod config;
mod output;

use clap::Parser;
use std::time::Instant;

use dnsx_client::Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = args::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if cli.verbose { "debug" } else { "warn" }.parse().unwrap()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    // The TLS transports need a process-level crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let file = config::FileConfig::load(cli.config.as_deref())?;
    let options = cli.client_options(&file)?;

    let color = match cli.color.as_str() {
        "always" => true,
        "never" => false,
        _ => atty::is(atty::Stream::Stdout),
    };
    let render = output::RenderOptions {
        short: cli.short,
        json: cli.json,
        color,
        seconds: cli.seconds,
        edns: options.edns,
    };

    let started = Instant::now();
    let responses = Client::new(options).run().await?;
    let elapsed = cli.time.then(|| started.elapsed());

    output::print_responses(&responses, elapsed, &render);
    Ok(())
}
