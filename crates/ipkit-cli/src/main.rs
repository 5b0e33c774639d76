use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ipkit_cidr::{SubnetBlock, Subdivision};
use ipkit_client::LookupClient;
use ipkit_core::config::LookupConfig;
use ipkit_core::Ipv4Address;

mod batch;
mod output;

use batch::BatchProcessor;
use output::{Conversion, OutputFormat, SubnetReport};

/// IPv4 address toolkit: classification, mapped IPv6 conversion and subnet calculation
#[derive(Parser)]
#[command(name = "ipkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an IPv4 address and show its binary, hex and decimal forms
    Analyze(AnalyzeArgs),
    /// Convert between IPv4 and IPv4-mapped IPv6
    Convert(ConvertArgs),
    /// Calculate a CIDR block, optionally split into smaller subnets
    Subnet(SubnetArgs),
    /// Show this machine's public IPv4 address
    PublicIp,
    /// Geolocate an address (this machine's public address by default)
    Geo(GeoArgs),
    /// Analyze many addresses or CIDR blocks from a file or stdin
    Batch(BatchArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// IPv4 address (e.g., 192.168.1.1)
    #[arg(value_name = "IP", required_unless_present = "public")]
    target: Option<String>,

    /// Analyze this machine's public address instead
    #[arg(long, conflicts_with = "target")]
    public: bool,

    /// Show how each result was derived
    #[arg(short, long)]
    explain: bool,
}

#[derive(Parser)]
struct ConvertArgs {
    #[command(subcommand)]
    direction: ConvertDirection,
}

#[derive(Subcommand)]
enum ConvertDirection {
    /// IPv4 to ::ffff:HHHH:HHHH
    ToIpv6 {
        #[arg(value_name = "IPV4")]
        address: String,
    },
    /// ::ffff:HHHH:HHHH to IPv4
    ToIpv4 {
        #[arg(value_name = "IPV6")]
        address: String,
    },
}

#[derive(Parser)]
struct SubnetArgs {
    /// CIDR block (e.g., 192.168.1.0/24)
    #[arg(value_name = "CIDR")]
    cidr: String,

    /// Split into this many subnets (rounded up to a power of two)
    #[arg(short, long, conflicts_with = "prefix")]
    count: Option<u32>,

    /// Split into subnets of this prefix length
    #[arg(short, long)]
    prefix: Option<u8>,

    /// Show how the mask, network and broadcast were derived
    #[arg(short, long)]
    explain: bool,
}

#[derive(Parser)]
struct GeoArgs {
    /// IPv4 address to locate
    #[arg(value_name = "IP")]
    ip: Option<String>,
}

#[derive(Parser)]
struct BatchArgs {
    /// Input file (use '-' for stdin)
    #[arg(short, long, value_name = "FILE")]
    file: Option<String>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, cli.output)?,
        Commands::Convert(args) => handle_convert(args, cli.output)?,
        Commands::Subnet(args) => handle_subnet(args, cli.output)?,
        Commands::PublicIp => handle_public_ip(cli.output)?,
        Commands::Geo(args) => handle_geo(args, cli.output)?,
        Commands::Batch(args) => handle_batch(args, cli.output)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn lookup_client() -> Result<LookupClient> {
    let config = LookupConfig::from_env()?;
    debug!(?config, "lookup configuration");
    Ok(LookupClient::with_config(config)?)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

fn handle_analyze(args: AnalyzeArgs, format: OutputFormat) -> Result<()> {
    let address = match args.target {
        Some(ref target) => Ipv4Address::parse(target)?,
        None => {
            eprintln!("{} Fetching public IP address", "›".blue());
            let client = lookup_client()?;
            runtime()?
                .block_on(client.public_ip())
                .context("public IP lookup failed")?
        }
    };

    let analysis = ipkit_classify::analyze(address);
    output::print_analysis(&analysis, format, args.explain)
}

fn handle_convert(args: ConvertArgs, format: OutputFormat) -> Result<()> {
    let conversion = match args.direction {
        ConvertDirection::ToIpv6 { address } => {
            let ipv4 = Ipv4Address::parse(&address)?;
            Conversion {
                output: ipkit_mapped::ipv4_to_mapped_ipv6(ipv4),
                input: address,
            }
        }
        ConvertDirection::ToIpv4 { address } => {
            let ipv4 = ipkit_mapped::mapped_ipv6_to_ipv4(&address)?;
            Conversion {
                output: ipv4.to_string(),
                input: address,
            }
        }
    };

    output::print_conversion(&conversion, format)
}

fn handle_subnet(args: SubnetArgs, format: OutputFormat) -> Result<()> {
    let block = SubnetBlock::parse(&args.cidr)?;

    let mode = match (args.count, args.prefix) {
        (Some(count), _) => Some(Subdivision::ByCount(count)),
        (None, Some(prefix)) => Some(Subdivision::ByPrefix(prefix)),
        (None, None) => None,
    };

    let subnets = match mode {
        Some(mode) => block.subdivide(mode)?,
        None => Vec::new(),
    };

    let report = SubnetReport {
        block: block.to_string(),
        descriptor: block.descriptor(),
        subnets,
        steps: if args.explain { block.explain() } else { Vec::new() },
    };

    output::print_subnet(&report, format)
}

fn handle_public_ip(format: OutputFormat) -> Result<()> {
    let client = lookup_client()?;
    let ip = runtime()?
        .block_on(client.public_ip())
        .context("public IP lookup failed")?;

    output::print_public_ip(ip, format)
}

fn handle_geo(args: GeoArgs, format: OutputFormat) -> Result<()> {
    let ip = args.ip.as_deref().map(Ipv4Address::parse).transpose()?;

    let client = lookup_client()?;
    let location = runtime()?
        .block_on(client.geolocate(ip))
        .context("geolocation lookup failed")?;

    output::print_geo(&location, format)
}

fn handle_batch(args: BatchArgs, format: OutputFormat) -> Result<()> {
    let lines = batch::read_inputs(args.file.as_deref())?;
    let processor = BatchProcessor::new(args.workers)?;

    debug!(
        inputs = lines.len(),
        threads = processor.thread_count(),
        "batch processing"
    );

    let results = processor.process(lines);
    output::print_batch(&results, format)
}
