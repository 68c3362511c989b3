use {
    super::*,
    clap::builder::styling::{AnsiColor, Effects, Styles},
};

#[derive(Debug, Parser)]
#[command(
  version,
  about = "Solo Stratum v1 miner",
  styles = Styles::styled()
    .error(AnsiColor::Red.on_default() | Effects::BOLD)
    .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
    .invalid(AnsiColor::Red.on_default())
    .literal(AnsiColor::Blue.on_default())
    .placeholder(AnsiColor::Cyan.on_default())
    .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
    .valid(AnsiColor::Green.on_default()),
)]
pub(crate) struct Arguments {
    #[command(flatten)]
    pub(crate) options: Options,
}

impl Arguments {
    pub(crate) async fn run(self, cancel: CancellationToken) -> Result {
        let settings = Settings::from(self.options);
        settings.validate()?;

        info!(
            "Mining to {} on {} via {} ({} backend)",
            settings.address,
            settings.network,
            settings.endpoint(),
            settings.backend,
        );

        let backend = backend::create(settings.backend, settings.threads());
        let endpoint = settings.endpoint();
        let miner = Miner::start(settings, backend, cancel.clone());
        let mut states = miner.states();

        let refused = tokio::select! {
            _ = cancel.cancelled() => false,
            state = states.wait_for(|state| state.is_terminal()) => state.is_ok(),
        };

        miner.stop().await;

        ensure!(!refused, "pool {endpoint} refused the worker credentials");

        Ok(())
    }
}
