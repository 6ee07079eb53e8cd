use clap::Parser;
use eyre::{Context, Result, eyre};
use lifelog_export::client::{Client, DEFAULT_API_URL, DEFAULT_PAGE_SIZE, Direction};
use lifelog_export::exporter;
use lifelog_export::utils::{self, ExportConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Export Limitless lifelogs to Markdown files named after their start time.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to export markdown files.
    /// Defaults to ./export if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/lifelog-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// IANA timezone used for file names (e.g. "Europe/Berlin").
    /// Defaults to America/Chicago.
    #[arg(long, value_name = "TZ")]
    timezone: Option<String>,

    /// Fetch order.
    #[arg(long, value_name = "asc|desc", default_value = "asc")]
    direction: Direction,

    /// Stop after this many lifelogs. Fetches everything if omitted.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Lifelogs requested per API page.
    #[arg(long, value_name = "N")]
    page_size: Option<usize>,
}

#[derive(Deserialize, Default, Debug)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    timezone: Option<String>,
    api_url: Option<String>,
    page_size: Option<usize>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("lifelog-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

/// Config file beats `LIMITLESS_API_URL`, which beats the public API host.
fn resolve_api_url(from_config: Option<String>, from_env: Option<String>) -> String {
    from_config
        .or(from_env)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    // 1. Environment (.env first, real environment wins)
    utils::load_dotenv();

    // 2. Config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;
    log::debug!("File config: {:?}", file_cfg);

    // 3. Resolve settings (CLI > Config > Environment > Default)
    let target_dir = cli
        .target_dir
        .or(file_cfg.target_dir)
        .unwrap_or_else(|| PathBuf::from(utils::DEFAULT_TARGET_DIR));

    let timezone = match cli.timezone.or(file_cfg.timezone) {
        Some(name) => utils::parse_timezone(&name)?,
        None => utils::DEFAULT_TIMEZONE,
    };

    let api_url = resolve_api_url(file_cfg.api_url, utils::env_var(utils::API_URL_VAR));

    let page_size = cli
        .page_size
        .or(file_cfg.page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    // 4. Build the API client
    let client = Client::new(&api_url, utils::env_var(utils::API_KEY_VAR))
        .wrap_err("Failed to set up API client")?
        .with_page_size(page_size)
        .with_timezone(timezone.name());
    log::debug!("Using endpoint {}", client.endpoint());

    // 5. Run the Business Logic
    let config = ExportConfig {
        target_dir,
        timezone,
    };
    exporter::run(&client, cli.direction, cli.limit, &config)?;

    Ok(())
}
