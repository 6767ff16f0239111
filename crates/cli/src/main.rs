use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "libris", version, about = "Libris catalog service")]
struct Cli {
    /// Configuration directory (overrides LIBRIS_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<std::path::PathBuf>,

    /// Environment name (overrides LIBRIS_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve,
    /// Print the resolved settings as JSON
    Config,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match (&cli.config_dir, &cli.env) {
        (None, None) => Settings::load(),
        (dir, env) => {
            let dir = match dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()
                    .context("unable to resolve current directory")?
                    .join("config"),
            };
            let env = env
                .clone()
                .or_else(|| std::env::var("LIBRIS_ENV").ok())
                .unwrap_or_else(|| "local".to_string());
            Settings::load_from(&dir, &env)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli).with_context(|| "failed to load Libris settings")?;

    match cli.command {
        Command::Serve => {
            libris_telemetry::init(&settings.telemetry)?;
            tracing::info!(
                environment = ?settings.environment,
                address = %settings.server.bind_address(),
                "starting libris"
            );
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(libris_app::run(settings))
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn env_flag_is_global() {
        let cli = Cli::try_parse_from(["libris", "config", "--env", "staging"]).unwrap();
        assert_eq!(cli.env.as_deref(), Some("staging"));
        assert!(matches!(cli.command, Command::Config));
    }
}
