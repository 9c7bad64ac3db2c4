use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod api;
mod config;
mod error;

use api::{
    AddressSpec, Client, ClientConfig, Endpoint, QueryOptions, RatePolicy, extract_properties,
};
use config::FileConfig;

/// Fetch property records from the ATTOM Data property API
///
/// Examples:
///   # Look up one property by address
///   propfetch -e detail --address "4529 Winona Ct, Denver, CO"
///
///   # Two-line address against the basic profile endpoint
///   propfetch -e basic --address1 "4529 Winona Ct" --address2 "Denver, CO"
///
///   # Sales snapshot around a coordinate, custom price band
///   propfetch -e sales --lat 39.7777 --lon -105.0447 --min 250000 --max 750000
///
///   # Batch over a JSON file of address objects, 2 seconds between calls
///   propfetch -e address --input addresses.json --delay 2 -o results.json
#[derive(Parser, Debug)]
#[command(name = "propfetch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches propfetch.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endpoint: id, basic, detail, snapshot, address, or sales
    #[arg(short = 'e', long, default_value = "detail")]
    endpoint: Endpoint,

    /// One-line address ("street, city, state")
    #[arg(short = 'a', long, conflicts_with_all = ["address1", "lat", "input"])]
    address: Option<String>,

    /// Street portion of a two-line address (use with --address2)
    #[arg(long, requires = "address2")]
    address1: Option<String>,

    /// Locality portion of a two-line address (use with --address1)
    #[arg(long, requires = "address1")]
    address2: Option<String>,

    /// Latitude for coordinate lookup (use with --lon)
    #[arg(long, requires = "lon", conflicts_with_all = ["address", "address1", "input"])]
    lat: Option<f64>,

    /// Longitude for coordinate lookup (use with --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// JSON file holding an array of address objects for batch lookup
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// API key (falls back to ATTOM_API_KEY, then the config file)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Search radius in miles (address/sales endpoints)
    #[arg(short = 'r', long, default_value = "20")]
    radius: u32,

    /// Property type filter
    #[arg(long, default_value = "SFR")]
    propertytype: String,

    /// Result page to request
    #[arg(long, default_value = "1")]
    page: u32,

    /// Results per page
    #[arg(long, default_value = "100")]
    pagesize: u32,

    /// Minimum sale amount (sales endpoint)
    #[arg(long, default_value = "100000")]
    min: u64,

    /// Maximum sale amount (sales endpoint)
    #[arg(long, default_value = "1000000")]
    max: u64,

    /// Seconds to wait between batch calls (0 disables the delay)
    #[arg(long, default_value = "5")]
    delay: u64,

    /// Treat HTTP error statuses as fatal instead of warn-and-continue
    #[arg(long)]
    strict: bool,

    /// Output JSON file (defaults to stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("ATTOM_API_KEY").ok())
        .or_else(|| file_config.as_ref().and_then(|c| c.api_key.clone()));
    let Some(api_key) = api_key else {
        bail!("No API key provided (use --api-key, ATTOM_API_KEY, or a config file)");
    };

    let delay = if args.delay != 5 {
        args.delay
    } else {
        file_config.as_ref().map(|c| c.delay_secs).unwrap_or(5)
    };
    let strict = args.strict || file_config.as_ref().map(|c| c.strict).unwrap_or(false);

    let mut client_config = ClientConfig::new(api_key);
    client_config.strict = strict;
    client_config.rate_policy = if delay == 0 {
        RatePolicy::None
    } else {
        RatePolicy::FixedDelay(Duration::from_secs(delay))
    };
    if let Some(base_url) = file_config.as_ref().and_then(|c| c.base_url.clone()) {
        client_config.base_url = base_url;
    }
    if let Some(user_agent) = file_config.as_ref().and_then(|c| c.user_agent.clone()) {
        client_config.user_agent = user_agent;
    }
    if let Some(config) = file_config.as_ref() {
        client_config.timeout_secs = config.timeout_secs;
    }

    let options = QueryOptions {
        radius: args.radius,
        propertytype: args.propertytype.clone(),
        page: args.page,
        pagesize: args.pagesize,
        min_sale_amt: args.min,
        max_sale_amt: args.max,
    };

    let items = collect_items(&args)?;
    if items.is_empty() {
        bail!("Must provide --address, --address1/--address2, --lat/--lon, or --input");
    }

    if args.verbose {
        println!("Configuration:");
        println!("  Endpoint: {}", args.endpoint);
        println!("  Items: {}", items.len());
        println!("  Radius: {} miles", args.radius);
        println!("  Property type: {}", args.propertytype);
        println!("  Page: {} (size {})", args.page, args.pagesize);
        if args.endpoint == Endpoint::Sales {
            println!("  Sale amount: {} - {}", args.min, args.max);
        }
        println!("  Delay between calls: {}s", delay);
        println!("  Strict mode: {}", strict);
        println!();
    }

    let client = Client::new(client_config).context("Failed to create API client")?;

    let spinner = create_spinner(&format!(
        "Fetching {} item{} from {}...",
        items.len(),
        if items.len() == 1 { "" } else { "s" },
        args.endpoint
    ));
    let start = Instant::now();
    let responses = client
        .fetch_batch(args.endpoint, &options, &items)
        .context("Batch fetch failed")?;
    let failures = responses.iter().filter(|r| !r.is_success()).count();
    spinner.finish_with_message(format!(
        "Fetched {} responses ({} failed) [{:.1}s]",
        responses.len(),
        failures,
        start.elapsed().as_secs_f32()
    ));

    let tables = extract_properties(&responses);
    let total_rows: usize = tables.iter().map(|t| t.rows.len()).sum();
    println!(
        "Extracted {} property rows from {} successful responses",
        total_rows,
        tables.len()
    );

    let output = serde_json::Value::Array(tables.iter().map(|t| t.to_json()).collect());
    let rendered = serde_json::to_string_pretty(&output)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .context(format!("Failed to write output file: {:?}", path))?;
            println!("Output: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    if args.verbose {
        println!(
            "Done! Total time: {:.1}s",
            total_start.elapsed().as_secs_f32()
        );
    }

    Ok(())
}

/// Assemble the lookup items from the flags or the batch input file.
fn collect_items(args: &Args) -> Result<Vec<AddressSpec>> {
    if let Some(ref input) = args.input {
        let contents = std::fs::read_to_string(input)
            .context(format!("Failed to read input file: {:?}", input))?;
        let values: Vec<serde_json::Value> =
            serde_json::from_str(&contents).context("Input file must be a JSON array")?;

        let mut items = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let fields = value
                .as_object()
                .with_context(|| format!("Input item {} is not a JSON object", i))?;
            let spec = AddressSpec::from_fields(fields)
                .with_context(|| format!("Input item {} has invalid location fields", i))?;
            items.push(spec);
        }
        return Ok(items);
    }

    if let Some(address) = args.address.clone() {
        return Ok(vec![AddressSpec::OneLine { address }]);
    }
    if let (Some(address1), Some(address2)) = (args.address1.clone(), args.address2.clone()) {
        return Ok(vec![AddressSpec::TwoLine { address1, address2 }]);
    }
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        return Ok(vec![AddressSpec::Coordinates {
            latitude,
            longitude,
        }]);
    }

    Ok(Vec::new())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
