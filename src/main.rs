use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use publish::App;
use publish::Config;
use publish::clients::git::GitClient;
use publish::config::Overrides;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "publish")]
#[command(about = "Initialize, commit and push a working directory to a Git remote", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory to publish (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub path: Option<PathBuf>,

    /// Remote name
    #[arg(long, global = true)]
    pub remote: Option<String>,

    /// Remote URL
    #[arg(long, global = true)]
    pub remote_url: Option<String>,

    /// Branch to push
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Commit message used when there are changes
    #[arg(short, long, global = true)]
    pub message: Option<String>,

    /// Print progress to stderr and a JSON report to stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Init, commit and push (the default)
    Publish,
    /// Save remote, branch and message to .git/config
    Init,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            remote: self.remote.clone(),
            remote_url: self.remote_url.clone(),
            branch: self.branch.clone(),
            commit_message: self.message.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let path = match &cli.path {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let path = path
        .canonicalize()
        .with_context(|| format!("Directory not found: {}", path.display()))?;

    match &cli.command {
        Some(Commands::Init) => {
            let config = Config::from_overrides(cli.overrides())?;
            let app = App::new(config, path);
            app.cmd_init(&mut std::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Publish) | None => {
            let config = Config::load(&GitClient::new(path.clone()), cli.overrides()).await?;
            let app = App::new(config, path);

            let report = if cli.json {
                let report = app.cmd_publish(&mut std::io::stderr()).await?;
                println!("{}", report.to_json()?);
                report
            } else {
                app.cmd_publish(&mut std::io::stdout()).await?
            };

            if report.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn setup_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}
