pub mod chart;
pub mod chart_data;
pub mod filters;
pub mod orders;
pub mod products;
pub mod query;
pub mod series;

use serde::Serialize;

use crate::error::ReportError;
use filters::FilterConfig;

/// Numeric type of a chart metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Currency,
    Percent,
    Average,
}

impl ValueType {
    /// Tooltip format handed to the client; `currency` means the store's currency formatter.
    pub fn tooltip_value_format(&self) -> &'static str {
        match self {
            ValueType::Currency => "currency",
            ValueType::Percent => ".0%",
            ValueType::Number => ",",
            ValueType::Average => ",.2f",
        }
    }
}

/// A selectable metric of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub order: &'static str,
    pub orderby: &'static str,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportEndpoint {
    Orders,
    Products,
}

impl ReportEndpoint {
    pub fn parse(value: &str) -> Result<Self, ReportError> {
        match value {
            "orders" => Ok(ReportEndpoint::Orders),
            "products" => Ok(ReportEndpoint::Products),
            other => Err(ReportError::UnknownEndpoint(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportEndpoint::Orders => "orders",
            ReportEndpoint::Products => "products",
        }
    }

    pub fn charts(&self) -> &'static [ChartDefinition] {
        match self {
            ReportEndpoint::Orders => &orders::CHARTS,
            ReportEndpoint::Products => &products::CHARTS,
        }
    }

    pub fn filters(&self) -> Vec<FilterConfig> {
        match self {
            ReportEndpoint::Orders => orders::filters(),
            ReportEndpoint::Products => products::filters(),
        }
    }
}

/// The chart named by `name`, or the report's first chart.
pub fn selected_chart<'a>(
    name: Option<&str>,
    charts: &'a [ChartDefinition],
) -> Option<&'a ChartDefinition> {
    name.and_then(|name| charts.iter().find(|chart| chart.key == name))
        .or_else(|| charts.first())
}
