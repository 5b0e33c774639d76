//! Result rendering for the human, JSON and CSV output formats

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use ipkit_cidr::SubnetDescriptor;
use ipkit_classify::{AddressClass, AddressType, Analysis};
use ipkit_core::{format_thousands, Ipv4Address, Step};
use ipkit_geoip::GeoLocation;

use crate::batch::{BatchOutcome, BatchResult};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table output
    Human,
    /// JSON output (pretty-printed)
    Json,
    /// JSON output (compact)
    JsonCompact,
    /// CSV output
    Csv,
}

/// Mapped-address conversion in either direction
#[derive(Debug, Serialize)]
pub struct Conversion {
    pub input: String,
    pub output: String,
}

/// Subnet calculation with optional subdivision and explanation
#[derive(Debug, Serialize)]
pub struct SubnetReport {
    pub block: String,
    pub descriptor: SubnetDescriptor,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<SubnetDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

#[derive(Serialize)]
struct PublicIp {
    ip: Ipv4Address,
}

const DESCRIPTOR_HEADERS: [&str; 8] = [
    "cidr",
    "network",
    "netmask",
    "broadcast",
    "first_host",
    "last_host",
    "host_count",
    "prefix_len",
];

const GEO_HEADERS: [&str; 14] = [
    "query",
    "country",
    "country_code",
    "region",
    "region_name",
    "city",
    "zip",
    "lat",
    "lon",
    "timezone",
    "isp",
    "org",
    "as",
    "status",
];

pub fn print_analysis(analysis: &Analysis, format: OutputFormat, explain: bool) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let class = analysis.classification.address_class;
            let kind = analysis.classification.address_type;

            header("IPv4 Analysis");
            field("Address", analysis.address.to_string().bold());
            field("Class", class_color(class, &format!("Class {}", class)));
            field("Type", type_color(kind, &kind.to_string()));
            field("Decimal", analysis.decimal.normal());
            field("Hexadecimal", analysis.hexadecimal.normal());
            field("Binary", analysis.binary.normal());
            if explain {
                print_steps(&analysis.steps);
            }
            println!();
        }
        OutputFormat::Json => print_json(analysis, true)?,
        OutputFormat::JsonCompact => print_json(analysis, false)?,
        OutputFormat::Csv => {
            let c = &analysis.classification;
            print_csv(
                &["address", "class", "type", "binary", "hexadecimal", "decimal"],
                vec![vec![
                    analysis.address.to_string(),
                    c.address_class.to_string(),
                    c.address_type.to_string(),
                    analysis.binary.clone(),
                    analysis.hexadecimal.clone(),
                    analysis.address.to_u32().to_string(),
                ]],
            )?
        }
    }
    Ok(())
}

pub fn print_conversion(conversion: &Conversion, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            header("Address Conversion");
            field("Input", conversion.input.normal());
            field("Output", conversion.output.green());
            println!();
        }
        OutputFormat::Json => print_json(conversion, true)?,
        OutputFormat::JsonCompact => print_json(conversion, false)?,
        OutputFormat::Csv => print_csv(
            &["input", "output"],
            vec![vec![conversion.input.clone(), conversion.output.clone()]],
        )?,
    }
    Ok(())
}

pub fn print_subnet(report: &SubnetReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let d = &report.descriptor;
            header("Subnet Calculation");
            field("Network", d.network.to_string().green());
            field("Netmask", d.netmask.to_string().normal());
            field("Broadcast", d.broadcast.to_string().normal());
            field("First Host", d.first_host.to_string().normal());
            field("Last Host", d.last_host.to_string().normal());
            field("Host Count", format_thousands(d.host_count).normal());
            field("CIDR", format!("/{}", d.prefix_len).normal());
            print_steps(&report.steps);

            if !report.subnets.is_empty() {
                println!();
                println!(
                    "{}",
                    format!("{} subnets of {}", report.subnets.len(), report.block)
                        .bold()
                        .cyan()
                );
                println!("{}", "─".repeat(70).dimmed());
                for (i, s) in report.subnets.iter().enumerate() {
                    println!(
                        "{:>5}  {:<18} {:>15} - {:<15} {:>10} hosts",
                        i + 1,
                        s.to_string().green(),
                        s.first_host,
                        s.last_host,
                        format_thousands(s.host_count)
                    );
                }
            }
            println!();
        }
        OutputFormat::Json => print_json(report, true)?,
        OutputFormat::JsonCompact => print_json(report, false)?,
        OutputFormat::Csv => {
            let rows = if report.subnets.is_empty() {
                vec![descriptor_row(&report.descriptor)]
            } else {
                report.subnets.iter().map(descriptor_row).collect()
            };
            print_csv(&DESCRIPTOR_HEADERS, rows)?
        }
    }
    Ok(())
}

pub fn print_public_ip(ip: Ipv4Address, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => println!("{}", ip.to_string().green()),
        OutputFormat::Json => print_json(&PublicIp { ip }, true)?,
        OutputFormat::JsonCompact => print_json(&PublicIp { ip }, false)?,
        OutputFormat::Csv => print_csv(&["ip"], vec![vec![ip.to_string()]])?,
    }
    Ok(())
}

pub fn print_geo(location: &GeoLocation, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            header("IP Geolocation");
            field("IP", location.query.bold());
            if let Some(ref country) = location.country {
                let code = location.country_code.as_deref().unwrap_or("?");
                field("Country", format!("{} ({})", country, code).normal());
            }
            if let Some(ref region) = location.region_name {
                let code = location.region.as_deref().unwrap_or("?");
                field("Region", format!("{} ({})", region, code).normal());
            }
            if let Some(ref city) = location.city {
                field("City", city.normal());
            }
            if let Some(ref zip) = location.zip {
                field("Postal Code", zip.normal());
            }
            if let Some((lat, lon)) = location.coordinates() {
                field("Coordinates", format!("{:.4}, {:.4}", lat, lon).normal());
            }
            if let Some(ref tz) = location.timezone {
                field("Timezone", tz.normal());
            }
            if let Some(ref isp) = location.isp {
                field("ISP", isp.normal());
            }
            if let Some(ref org) = location.org {
                field("Organization", org.normal());
            }
            if let Some(ref asn) = location.autonomous_system {
                field("AS", asn.normal());
            }
            println!();
        }
        OutputFormat::Json => print_json(location, true)?,
        OutputFormat::JsonCompact => print_json(location, false)?,
        OutputFormat::Csv => print_csv(&GEO_HEADERS, vec![geo_row(location)])?,
    }
    Ok(())
}

pub fn print_batch(results: &[BatchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            header("Batch Results");
            for result in results {
                match &result.outcome {
                    BatchOutcome::Address(a) => println!(
                        "{:<20} {} {}",
                        result.input,
                        class_color(
                            a.classification.address_class,
                            &format!("Class {}", a.classification.address_class)
                        ),
                        type_color(
                            a.classification.address_type,
                            &a.classification.address_type.to_string()
                        )
                    ),
                    BatchOutcome::Subnet(d) => println!(
                        "{:<20} {} - {} ({} hosts)",
                        result.input,
                        d.first_host,
                        d.last_host,
                        format_thousands(d.host_count)
                    ),
                    BatchOutcome::Error { message } => {
                        println!("{:<20} {}", result.input, message.red())
                    }
                }
            }
            let failed = results
                .iter()
                .filter(|r| matches!(r.outcome, BatchOutcome::Error { .. }))
                .count();
            println!("{}", "─".repeat(50).dimmed());
            println!("{} inputs, {} failed", results.len(), failed);
            println!();
        }
        OutputFormat::Json => print_json(&results, true)?,
        OutputFormat::JsonCompact => print_json(&results, false)?,
        OutputFormat::Csv => {
            let rows = results
                .iter()
                .map(|r| match &r.outcome {
                    BatchOutcome::Address(a) => vec![
                        r.input.clone(),
                        "address".to_string(),
                        format!(
                            "class {} {}",
                            a.classification.address_class, a.classification.address_type
                        ),
                    ],
                    BatchOutcome::Subnet(d) => vec![
                        r.input.clone(),
                        "subnet".to_string(),
                        format!("{} - {} ({} hosts)", d.first_host, d.last_host, d.host_count),
                    ],
                    BatchOutcome::Error { message } => {
                        vec![r.input.clone(), "error".to_string(), message.clone()]
                    }
                })
                .collect();
            print_csv(&["input", "kind", "result"], rows)?
        }
    }
    Ok(())
}

fn header(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
    println!("{}", "─".repeat(50).dimmed());
}

fn field(label: &str, value: ColoredString) {
    println!("{:>15}: {}", label.bold(), value);
}

fn print_steps(steps: &[Step]) {
    if steps.is_empty() {
        return;
    }
    println!();
    println!("{}", "Details".bold().cyan());
    for (i, step) in steps.iter().enumerate() {
        println!("{:>4}. {} {}", i + 1, step.title.bold(), step.detail);
    }
}

fn class_color(class: AddressClass, text: &str) -> ColoredString {
    match class {
        AddressClass::A => text.blue(),
        AddressClass::B => text.green(),
        AddressClass::C => text.yellow(),
        AddressClass::D => text.purple(),
        AddressClass::E => text.red(),
    }
}

fn type_color(kind: AddressType, text: &str) -> ColoredString {
    match kind {
        k if k.is_private() => text.yellow(),
        AddressType::Public => text.green(),
        AddressType::Loopback | AddressType::LinkLocal => text.cyan(),
        _ => text.magenta(),
    }
}

fn descriptor_row(d: &SubnetDescriptor) -> Vec<String> {
    vec![
        d.to_string(),
        d.network.to_string(),
        d.netmask.to_string(),
        d.broadcast.to_string(),
        d.first_host.to_string(),
        d.last_host.to_string(),
        d.host_count.to_string(),
        d.prefix_len.to_string(),
    ]
}

fn geo_row(location: &GeoLocation) -> Vec<String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        location.query.clone(),
        opt(&location.country),
        opt(&location.country_code),
        opt(&location.region),
        opt(&location.region_name),
        opt(&location.city),
        opt(&location.zip),
        location.lat.map_or(String::new(), |v| v.to_string()),
        location.lon.map_or(String::new(), |v| v.to_string()),
        opt(&location.timezone),
        opt(&location.isp),
        opt(&location.org),
        opt(&location.autonomous_system),
        location.status.clone(),
    ]
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

fn print_csv(headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_row_matches_headers() {
        let location = GeoLocation::from_json(
            r#"{"status":"success","query":"8.8.8.8","country":"United States",
                "countryCode":"US","region":"VA","regionName":"Virginia",
                "city":"Ashburn","zip":"20149","lat":39.03,"lon":-77.5,
                "timezone":"America/New_York","isp":"Google LLC",
                "org":"Google Public DNS","as":"AS15169 Google LLC"}"#,
        )
        .unwrap();

        let row = geo_row(&location);
        assert_eq!(row.len(), GEO_HEADERS.len());

        let column = |name: &str| {
            let i = GEO_HEADERS.iter().position(|h| *h == name).unwrap();
            row[i].as_str()
        };
        assert_eq!(column("region"), "VA");
        assert_eq!(column("region_name"), "Virginia");
        assert_eq!(column("zip"), "20149");
        assert_eq!(column("as"), "AS15169 Google LLC");
        assert_eq!(column("lon"), "-77.5");
    }

    #[test]
    fn test_geo_row_missing_fields_are_empty() {
        let location =
            GeoLocation::from_json(r#"{"status":"success","query":"1.1.1.1"}"#).unwrap();
        let row = geo_row(&location);
        assert_eq!(row[0], "1.1.1.1");
        assert!(row[1..13].iter().all(String::is_empty));
    }
}
