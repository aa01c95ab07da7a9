//! crm-list: print flattened SuiteCRM records as JSON lines
//!
//! Connection settings come from `SUITECRM_*` variables (or `.env`).
//!
//! ```text
//! crm-list Accounts --fields name,billingCity --link contacts=firstName,email1 --limit 5
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use suitecrm_client::{
    AttributeSchema, CrmClient, CrmConfig, FieldType, ListQuery, Module, OrderDirection,
};

#[derive(Parser, Debug)]
#[command(name = "crm-list")]
#[command(about = "List SuiteCRM entries as flattened JSON records")]
struct Args {
    /// Remote module name (e.g., "Accounts")
    module: String,

    /// Own fields to fetch, camelCase, comma-separated (default: all)
    #[arg(long, short = 'f', value_delimiter = ',')]
    fields: Vec<String>,

    /// Relationship to expand as link=field1,field2 (can be specified multiple times)
    #[arg(long, short = 'k', value_parser = parse_link)]
    link: Vec<(String, Vec<String>)>,

    /// Filter expression passed through to the server
    #[arg(long, default_value = "")]
    filter: String,

    /// Field to order by
    #[arg(long)]
    order_by: Option<String>,

    /// Sort descending
    #[arg(long, requires = "order_by")]
    desc: bool,

    /// Maximum number of records
    #[arg(long, short = 'l', default_value_t = 20)]
    limit: u32,

    /// Offset of the first record
    #[arg(long, default_value_t = 0)]
    offset: u32,

    /// Include soft-deleted records
    #[arg(long)]
    deleted: bool,
}

fn parse_link(s: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (name, fields) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid link '{}': expected link=field1,field2", s))?;
    let fields = fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.trim().to_string(), fields))
}

/// Schema that accepts whatever was asked for.
fn open_schema<'a>(fields: impl IntoIterator<Item = &'a String>) -> AttributeSchema {
    fields
        .into_iter()
        .map(|f| (f.clone(), FieldType::Any))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let config = CrmConfig::from_env().context("Failed to load SuiteCRM settings")?;

    let own_fields = args.fields.iter().chain(args.order_by.iter());
    let mut module = Module::new(&args.module, open_schema(own_fields));
    for (link, fields) in &args.link {
        let target = Arc::new(Module::new(link, open_schema(fields)));
        module = module.with_relationship(link, target)?;
    }

    let mut query = ListQuery::new(&module)
        .filter(&args.filter)
        .offset(args.offset)
        .select(&args.fields)
        .max_results(args.limit)
        .include_deleted(args.deleted);
    if let Some(order_by) = &args.order_by {
        let direction = if args.desc {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        };
        query = query.order_by_direction(order_by, direction);
    }
    for (link, fields) in &args.link {
        let key = suitecrm_client::case::to_internal(link);
        query = query.with(module.select_related(&key, fields)?);
    }

    let client = CrmClient::new(&config)?;
    let page = client.list_entries_page(&query).await?;
    for record in &page.records {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::info!(
        returned = page.records.len(),
        total = ?page.total_count,
        next_offset = ?page.next_offset,
        "Listed {}",
        args.module
    );

    client.logout().await?;
    Ok(())
}
