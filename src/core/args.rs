use clap::Parser;
use log::kv::{ToValue, Value};

use crate::query::SortDirection;

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Resource to list, e.g. clients or testimonials.
    #[arg(short, long)]
    pub resource: String,
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub page_size: Option<u32>,
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, value_enum, default_value_t = SortDirection::Asc)]
    pub order: SortDirection,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
