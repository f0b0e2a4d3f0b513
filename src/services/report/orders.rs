use super::filters::{FilterConfig, FilterOption};
use super::query::ReportQuery;
use super::{ChartDefinition, ValueType};

pub const CHARTS: [ChartDefinition; 4] = [
    ChartDefinition {
        key: "orders_count",
        label: "Orders",
        order: "desc",
        orderby: "date",
        value_type: ValueType::Number,
    },
    ChartDefinition {
        key: "net_revenue",
        label: "Net Revenue",
        order: "desc",
        orderby: "net_total",
        value_type: ValueType::Currency,
    },
    ChartDefinition {
        key: "avg_order_value",
        label: "Average Order Value",
        order: "desc",
        orderby: "net_total",
        value_type: ValueType::Currency,
    },
    ChartDefinition {
        key: "avg_items_per_order",
        label: "Average Items Per Order",
        order: "desc",
        orderby: "num_items_sold",
        value_type: ValueType::Average,
    },
];

fn always(_: &ReportQuery) -> bool {
    true
}

pub fn filters() -> Vec<FilterConfig> {
    vec![FilterConfig {
        param: "filter".to_string(),
        show_filters: always,
        filters: vec![
            FilterOption::new("All Orders", "all"),
            FilterOption::new("Advanced Filters", "advanced"),
        ],
    }]
}
