//! Sonoverse - scalar field viewer
//!
//! CLI commands:
//! - serve: Serve the cube mesh + evaluated field over HTTP
//! - view: Open the 3D viewer with orbit navigation
//! - colorize: Colorize a payload's field into a PNG
//! - generate: Write the served payload to a JSON file

mod colorize;
mod config;
mod logging;
mod orbit;
mod payload;
mod potential;
mod server;
mod shapes;
mod state;
mod viewer;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sonoverse")]
#[command(about = "Mesh + scalar field viewer with false-color ground plane")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sonoverse.yaml config
    #[arg(short, long, default_value = "sonoverse.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (defaults to $PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Launch the native 3D viewer
    View {
        /// Grid endpoint (defaults to $SONOVERSE_URL)
        #[arg(long)]
        url: Option<String>,

        /// Read the grid from a JSON file instead
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Colorize a grid's field and save it as PNG
    Colorize {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long, default_value = "field.png")]
        output: PathBuf,
    },

    /// Write the generated grid payload as JSON
    Generate {
        #[arg(short, long, default_value = "grid.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = config::Env::load();

    logging::init_logging(&env.log_dir)?;
    tracing::info!("Sonoverse starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = config::Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve { port } => {
            let state = state::AppState::new(config.grid);
            server::serve(state, port.unwrap_or(env.port)).await?;
        }

        Commands::View { url, file } => {
            tracing::info!("Launching 3D viewer");
            let source = viewer::GridSource {
                url: url.unwrap_or(env.grid_url),
                file,
            };
            let handle = tokio::runtime::Handle::current();
            tokio::task::block_in_place(|| viewer::run(config, source, handle))?;
        }

        Commands::Colorize { url, file, output } => {
            let url = url.unwrap_or(env.grid_url);
            colorize_to_png(&config, &url, file.as_deref(), &output).await?;
        }

        Commands::Generate { output } => {
            let grid = config.grid;
            let payload = tokio::task::spawn_blocking(move || state::generate_payload(&grid)).await??;
            std::fs::write(&output, serde_json::to_string(&payload)?)?;
            println!(
                "Wrote {:?}: {} triangles, field {}x{}",
                output,
                payload.indices.len() / 3,
                payload.evaluated.width,
                payload.evaluated.height
            );
        }
    }

    Ok(())
}

/// Fetch or load a grid, colorize its field and write a PNG
async fn colorize_to_png(
    config: &config::Config,
    url: &str,
    file: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    let payload = payload::obtain_grid(url, file).await?;
    let field = payload.evaluated.to_scalar_field();

    let texture = colorize::colorize(&field, &config.colors.low, &config.colors.high)?;
    let img = texture
        .to_image()
        .ok_or_else(|| anyhow::anyhow!("Texture buffer does not match its dimensions"))?;
    img.save(output)?;

    tracing::info!("Saved {:?}", output);
    println!(
        "{}x{} field -> {:?} ({} missing samples)",
        field.width,
        field.height,
        output,
        field.missing_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_colorize_to_png_from_file() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("sonoverse_cli_{}.json", std::process::id()));
        let output = dir.join(format!("sonoverse_cli_{}.png", std::process::id()));

        let grid = config::GridConfig {
            length: 1.0,
            h: 0.5,
            resolution: 5,
            margin: 0.5,
        };
        let payload = state::generate_payload(&grid).unwrap();
        std::fs::write(&input, serde_json::to_string(&payload).unwrap()).unwrap();

        let config = config::Config::default();
        colorize_to_png(&config, "http://127.0.0.1:1/unused", Some(&input), &output)
            .await
            .unwrap();

        let img = image::open(&output).unwrap().to_rgba8();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
        assert_eq!(img.dimensions(), (5, 5));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["sonoverse", "view", "--file", "grid.json"]).unwrap();
        match cli.command {
            Commands::View { url, file } => {
                assert!(url.is_none());
                assert_eq!(file, Some(PathBuf::from("grid.json")));
            }
            _ => panic!("expected view"),
        }
    }
}
