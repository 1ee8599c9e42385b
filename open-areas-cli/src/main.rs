//! Command line front end composing the open areas map into a MapLibre style document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use geojson::GeoJson;
use open_areas::engine::EngineEvent;
use open_areas::{
    FileLoader, GeoJsonLoader, HttpLoader, MapConfig, MapController, SelectionBehavior,
    StyleDocument, StyleRegistry,
};

#[derive(Parser)]
#[command(name = "open-areas")]
#[command(author, version, about = "Composes the open areas inventory map", long_about = None)]
struct Cli {
    /// Map configuration (JSON). Built-in defaults are used if omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composed style document
    Compose {
        #[command(flatten)]
        source: DataSource,
        /// Basemap style, see `styles`
        #[arg(short, long)]
        style: Option<String>,
        /// Layer ids to hide, e.g. `landuse-polygons`
        #[arg(long)]
        hide: Vec<String>,
        /// Select the n-th feature of the interactive overlay
        #[arg(long)]
        select: Option<usize>,
        /// Zoom to the selection without outlining it
        #[arg(long)]
        zoom_only: bool,
        /// Write the document to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the padded map bounds
    Bounds {
        #[command(flatten)]
        source: DataSource,
    },
    /// List basemap styles
    Styles,
}

#[derive(Args)]
struct DataSource {
    /// Directory the site is deployed from; assets are read from `<dir>/data`
    #[arg(short, long, default_value = ".", conflicts_with = "origin")]
    data_dir: PathBuf,
    /// Download assets from this origin instead, e.g. `https://example.org`
    #[arg(long)]
    origin: Option<reqwest::Url>,
}

impl DataSource {
    fn loader(&self, config: &MapConfig) -> Box<dyn GeoJsonLoader> {
        match &self.origin {
            Some(origin) => {
                log::info!("Loading assets from {origin}");
                Box::new(HttpLoader::new(reqwest::Client::new(), origin.clone()))
            }
            None => {
                log::info!("Loading assets from {}", self.data_dir.display());
                Box::new(FileLoader::new(&self.data_dir, config.base_path.clone()))
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<MapConfig> {
    let config = match path {
        Some(path) => MapConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => MapConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn open_map(
    config: MapConfig,
    loader: &dyn GeoJsonLoader,
) -> Result<MapController<StyleDocument>> {
    let container = config.container.clone();
    let controller = MapController::initialize(container, config, StyleRegistry::builtin(), loader)
        .await
        .context("initializing the map")?;
    Ok(controller)
}

async fn nth_interactive_feature(
    controller: &MapController<StyleDocument>,
    loader: &dyn GeoJsonLoader,
    index: usize,
) -> Result<geojson::Feature> {
    let overlay = controller
        .catalog()
        .interactive()
        .context("the catalog has no interactive overlay")?;
    let url = controller.config().asset_url(&overlay.descriptor().url);

    let features = match loader.load(&url).await? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => vec![],
    };
    let count = features.len();
    features
        .into_iter()
        .nth(index)
        .with_context(|| format!("{url} has {count} features, cannot select #{index}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Styles => {
            for name in StyleRegistry::builtin().names() {
                println!("{name}");
            }
        }
        Commands::Bounds { source } => {
            let config = load_config(cli.config.as_ref())?;
            let loader = source.loader(&config);
            let controller = open_map(config, loader.as_ref()).await?;
            println!(
                "{}",
                serde_json::to_string(&controller.engine().camera().bounds)?
            );
        }
        Commands::Compose {
            source,
            style,
            hide,
            select,
            zoom_only,
            output,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(style) = style {
                config = config.with_initial_style(style);
            }
            if zoom_only {
                config = config.with_selection(SelectionBehavior::ZoomOnly);
            }

            let loader = source.loader(&config);
            let mut controller = open_map(config, loader.as_ref()).await?;

            for layer_id in &hide {
                if !controller.catalog().contains_layer(layer_id) {
                    log::warn!("No overlay draws layer {layer_id}");
                }
                controller.set_layer_visibility(layer_id, false)?;
            }

            if controller.handle_event(EngineEvent::Load) {
                controller
                    .load_layers(loader.as_ref())
                    .await
                    .context("loading overlays")?;
            }

            if let Some(index) = select {
                let feature = nth_interactive_feature(&controller, loader.as_ref(), index).await?;
                controller.select_feature(feature)?;
            }

            let document = serde_json::to_string_pretty(&controller.engine().to_json())?;
            match output {
                Some(path) => std::fs::write(&path, document)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{document}"),
            }
        }
    }

    Ok(())
}
