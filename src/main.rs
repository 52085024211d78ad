mod commands;
mod core;
mod release;
mod utils;

use clap::{ArgAction, Parser};
use crate::core::config::{DistMode, ReleaseSettings};
use crate::core::context::RunContext;
use crate::core::error::{RelError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build, sign, tag, upload and announce module releases
#[derive(Parser)]
#[command(name = "xrel")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Package with the faster `dist` target instead of `distcheck`
  #[arg(long, overrides_with = "distcheck")]
  dist: bool,

  /// Package with `distcheck` (default)
  #[arg(long, overrides_with = "dist")]
  distcheck: bool,

  /// Run local steps only; do not tag, upload or push
  #[arg(long)]
  dry_run: bool,

  /// Overwrite tarballs already published on the host
  #[arg(long)]
  force: bool,

  /// Keep going after a module fails
  #[arg(long)]
  no_quit: bool,

  /// GPG key used to sign tags and tarballs
  #[arg(long, value_name = "KEY")]
  gpgkey: Option<String>,

  /// Read module paths from FILE, one per line
  #[arg(long, value_name = "FILE", conflicts_with = "modules")]
  modfile: Option<PathBuf>,

  /// jhbuild moduleset to update after each release
  #[arg(long, value_name = "FILE")]
  moduleset: Option<PathBuf>,

  /// Login name on the upload hosts
  #[arg(long, value_name = "NAME")]
  user: Option<String>,

  /// Print the run summary as JSON
  #[arg(long)]
  json: bool,

  /// Increase diagnostic output (-v debug, -vv trace)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Module checkouts to release
  #[arg(value_name = "MODULES")]
  modules: Vec<PathBuf>,
}

impl Cli {
  fn settings(&self) -> ReleaseSettings {
    ReleaseSettings {
      dist_mode: if self.dist && !self.distcheck {
        DistMode::Dist
      } else {
        DistMode::Distcheck
      },
      dry_run: self.dry_run,
      force: self.force,
      continue_on_error: self.no_quit,
      gpg_key: self.gpgkey.clone(),
      user: self.user.clone(),
      moduleset: self.moduleset.clone(),
      json: self.json,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);
  let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
  let red = anstyle::Color::Ansi(anstyle::AnsiColor::Red);

  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .header(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .literal(anstyle::Style::new().fg_color(Some(green)))
    .invalid(anstyle::Style::new().bold().fg_color(Some(red)))
    .error(anstyle::Style::new().bold().fg_color(Some(red)))
    .valid(anstyle::Style::new().bold().underline().fg_color(Some(green)))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("xrel={level}")));
  let subscriber = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_level(true)
    .finish();

  let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);
  utils::set_machine_output(cli.json);

  let top_src = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(RelError::from(e).context("Failed to get current directory")),
  };

  // Configuration errors abort here, before any module is touched
  let tasks = match release::collect_tasks(&cli.modules, cli.modfile.as_deref()) {
    Ok(tasks) => tasks,
    Err(err) => handle_error(err),
  };
  let ctx = match RunContext::build(&top_src, cli.settings()) {
    Ok(ctx) => ctx,
    Err(err) => handle_error(err),
  };

  match commands::run_release(&ctx, &tasks) {
    Ok(summary) => {
      if let Some(code) = summary.exit_code() {
        std::process::exit(code.as_i32());
      }
    }
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: RelError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
