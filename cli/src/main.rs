use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use dbf_core::{
    write_json, Filter, JsonlTableSource, ReadOptions, ReadOrder, SourceConfig, TableReader,
    TableType,
};
use log::{debug, LevelFilter};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::PathBuf,
};

#[derive(Parser)]
#[command(author, version, about = "Read records from encrypted DBF/CDX tables")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Encryption password of the tables
    #[arg(long, env = "DBF_ENCRYPTION_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Native table engine library
    #[arg(long, env = "DBF_DRIVER_PATH", global = true)]
    driver_path: Option<PathBuf>,

    /// Index flavour of the tables
    #[arg(long, default_value = "cdx", global = true)]
    table_type: String,

    /// Open tables exclusively instead of shared
    #[arg(long, global = true)]
    exclusive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read records as JSON
    Read {
        /// Directory holding the tables
        #[arg(short, long)]
        data_source: PathBuf,

        /// Table name, e.g. VENTA
        #[arg(short, long)]
        table: String,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Filters as a JSON array, e.g.
        /// '[{"field":"F_EMISION","operator":"=","value":"05/05/2025","is_date":true}]'
        #[arg(long, conflicts_with = "filters_file")]
        filters: Option<String>,

        /// File holding the filters JSON array
        #[arg(long)]
        filters_file: Option<PathBuf>,

        /// Record order
        #[arg(long, value_enum, default_value_t = Order::Newest)]
        order: Order,

        /// Evaluate every filter in memory only
        #[arg(long)]
        no_pushdown: bool,

        /// Single-line JSON instead of indented
        #[arg(long)]
        compact: bool,

        /// Output file (use '-' for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },

    /// Show the columns of a table
    Info {
        /// Directory holding the tables
        #[arg(short, long)]
        data_source: PathBuf,

        /// Table name
        #[arg(short, long)]
        table: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Last record first
    Newest,
    /// Physical order
    Forward,
}

impl From<Order> for ReadOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Newest => ReadOrder::NewestFirst,
            Order::Forward => ReadOrder::Forward,
        }
    }
}

fn get_writer(output: &str) -> Result<Box<dyn Write>> {
    match output {
        "-" => Ok(Box::new(io::stdout())),
        path => Ok(Box::new(
            File::create(path).with_context(|| format!("cannot create {path}"))?,
        )),
    }
}

fn open_reader(
    connection: &ConnectionArgs,
    data_source: PathBuf,
) -> Result<TableReader<JsonlTableSource>> {
    let table_type: TableType = connection.table_type.parse()?;
    let mut config = SourceConfig::new(data_source)
        .with_table_type(table_type)
        .with_shared(!connection.exclusive);
    if let Some(password) = &connection.password {
        config = config.with_password(password.clone());
    }
    if let Some(driver) = &connection.driver_path {
        config = config.with_driver_path(driver.clone());
    }
    debug!("source config: {config:?}");
    let source = JsonlTableSource::new(&config)
        .with_context(|| format!("cannot open {}", config.data_source.display()))?;
    Ok(TableReader::new(source))
}

fn parse_filters(inline: Option<String>, file: Option<PathBuf>) -> Result<Vec<Filter>> {
    let json = match (inline, file) {
        (Some(json), _) => json,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("cannot read filters from {}", path.display()))?,
        (None, None) => return Ok(Vec::new()),
    };
    serde_json::from_str(&json).context("invalid filters JSON")
}

#[allow(clippy::too_many_arguments)]
fn read(
    connection: &ConnectionArgs,
    data_source: PathBuf,
    table: &str,
    limit: Option<usize>,
    filters: Vec<Filter>,
    order: Order,
    pushdown: bool,
    compact: bool,
    output: &str,
) -> Result<()> {
    let reader = open_reader(connection, data_source)?;
    let mut options = ReadOptions::new()
        .with_filters(filters)
        .with_order(order.into())
        .with_pushdown(pushdown);
    options.limit = limit;

    let records = reader
        .read(table, &options)
        .with_context(|| format!("failed to read {table}"))?;

    let mut writer = BufWriter::new(get_writer(output)?);
    write_json(&mut writer, &records, !compact)?;
    writeln!(writer)?;
    writer.flush()?;

    if output != "-" {
        eprintln!("Wrote {} records to {output}", records.len());
    }
    Ok(())
}

fn show_info(connection: &ConnectionArgs, data_source: PathBuf, table: &str) -> Result<()> {
    let reader = open_reader(connection, data_source)?;
    let info = reader
        .get_table_info(table)
        .with_context(|| format!("failed to open {table}"))?;

    println!("Table: {table}");
    println!("  Field count: {}", info.field_count);
    println!("  Columns:");
    for column in &info.columns {
        println!("    {column}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Read {
            data_source,
            table,
            limit,
            filters,
            filters_file,
            order,
            no_pushdown,
            compact,
            output,
        } => {
            let filters = parse_filters(filters, filters_file)?;
            read(
                &cli.connection,
                data_source,
                &table,
                limit,
                filters,
                order,
                !no_pushdown,
                compact,
                &output,
            )
        }
        Commands::Info { data_source, table } => show_info(&cli.connection, data_source, &table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_read_command() {
        let cli = Cli::try_parse_from([
            "dbf",
            "read",
            "--data-source",
            "/data",
            "--table",
            "VENTA",
            "--limit",
            "10",
            "--order",
            "forward",
            "--password",
            "secret",
        ])
        .unwrap();
        assert_eq!(cli.connection.password.as_deref(), Some("secret"));
        match cli.command {
            Commands::Read {
                table,
                limit,
                order,
                ..
            } => {
                assert_eq!(table, "VENTA");
                assert_eq!(limit, Some(10));
                assert_eq!(ReadOrder::from(order), ReadOrder::Forward);
            }
            Commands::Info { .. } => panic!("expected read"),
        }
    }

    #[test]
    fn filters_from_json() {
        let filters = parse_filters(
            Some(
                r#"[{"field": "F_EMISION", "operator": "=", "value": "04/05/2025", "is_date": true}]"#
                    .to_string(),
            ),
            None,
        )
        .unwrap();
        assert_eq!(filters.len(), 1);
        assert!(filters[0].is_date);
        assert!(parse_filters(Some("{".to_string()), None).is_err());
        assert!(parse_filters(None, None).unwrap().is_empty());
    }
}
