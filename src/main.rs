use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use orrery::SimParams;
use std::io;

/// Interactive sun/earth/moon visualization with a free-flying camera
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Sphere mesh subdivision count (latitude and longitude)
  #[arg(short, long, default_value_t = 20)]
  divisions: u32,
  /// Add the outer planets to the scene
  #[arg(long, default_value_t = false)]
  outer_planets: bool,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Stop after this many ticks in headless mode (0 = until ctrl-c)
  #[arg(long, default_value_t = 0)]
  ticks: u64,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return Ok(());
  }

  let params = SimParams {
    mesh_divisions: args.divisions,
    outer_planets: args.outer_planets,
    max_ticks: args.ticks,
    ..SimParams::default()
  };
  orrery::state::run(params, args.headless)
}
