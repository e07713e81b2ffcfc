use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use lamour::compositor::Compositor;
use lamour::config::Configuration;
use lamour::events::{Notifier, NoticeLevel};
use lamour::export::{ExportManager, ExportOutcome};
use lamour::photo::Rotation;
use lamour::session::load_typeface;

#[derive(Debug, Parser)]
#[command(name = "lamour-studio", version, about = "L'AMOUR card and photobooth studio")]
struct Cli {
    /// Path to YAML config; built-in defaults when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compose a card and export it as PNG
    Render {
        /// Template name (see `templates`)
        #[arg(short, long, default_value = "id-card")]
        template: String,
        /// Photo to place in the frame
        #[arg(short, long, value_name = "FILE")]
        photo: Option<PathBuf>,
        /// Name or message drawn on the card
        #[arg(long, default_value = "")]
        text: String,
        /// Clockwise rotation in degrees, snapped to quarter turns
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        rotate: i32,
        #[arg(long)]
        flip: bool,
        /// Zoom, for adjustable frames
        #[arg(long)]
        zoom: Option<f32>,
        /// Horizontal window shift in source pixels
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_x: f32,
        /// Vertical window shift in source pixels
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_y: f32,
        /// Output directory; overrides export.output-dir
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Time left until the event
    Countdown {
        /// Keep printing every second until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// List available templates
    Templates,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("lamour={level}").parse()?)
        .add_directive(format!("lamour_studio={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;

    match cli.command {
        Command::Templates => {
            for name in cfg.template_names() {
                let template = cfg.template(&name)?;
                println!(
                    "{name:<16} {}x{}",
                    template.size.width, template.size.height
                );
            }
        }
        Command::Countdown { watch } => run_countdown(&cfg, watch).await?,
        Command::Render {
            template,
            photo,
            text,
            rotate,
            flip,
            zoom,
            offset_x,
            offset_y,
            output,
        } => {
            let (notifier, mut notices) = Notifier::channel();
            let template = Arc::new(cfg.template(&template)?);
            let mut compositor = Compositor::new(template, load_typeface(&cfg), notifier);

            if let Some(path) = photo
                && !compositor.load_photo_file(path.clone()).await
            {
                bail!("could not load photo {}", path.display());
            }
            compositor.set_text(&text);
            for _ in 0..Rotation::from_degrees(rotate).degrees() / 90 {
                compositor.rotate();
            }
            if flip {
                compositor.flip();
            }
            if let Some(zoom) = zoom {
                compositor.set_zoom(zoom);
            }
            if offset_x != 0.0 || offset_y != 0.0 {
                compositor.set_offset(offset_x, offset_y);
            }

            let output_dir = output.unwrap_or_else(|| cfg.export.output_dir.clone());
            let exporter = ExportManager::new(output_dir);
            let outcome = compositor.export(&exporter, Utc::now());

            let mut failed = false;
            while let Ok(notice) = notices.try_recv() {
                failed |= notice.level == NoticeLevel::Error;
                eprintln!("{}", notice.message);
            }
            match outcome {
                Some(ExportOutcome::Saved { path }) => println!("{}", path.display()),
                Some(ExportOutcome::Shared { filename }) => println!("{filename}"),
                None => bail!("export failed"),
            }
            if failed {
                warn!("render finished with errors");
            }
        }
    }
    Ok(())
}

async fn run_countdown(cfg: &Configuration, watch: bool) -> Result<()> {
    let countdown = cfg.event.countdown()?;
    info!(starts_at = %countdown.target(), "counting down");
    if !watch {
        println!("{}", countdown.remaining(Utc::now()));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; stopping");
            cancel.cancel();
        });
    }

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let left = countdown.remaining(Utc::now());
                println!("{left}");
                if left.is_over() {
                    break;
                }
            }
        }
    }
    Ok(())
}
