use serde::Serialize;

use super::filters::{ChartMode, FilterConfig, FilterOption};
use super::query::ReportQuery;
use super::{ChartDefinition, ValueType};
use crate::services::search::SearchType;

pub const CHARTS: [ChartDefinition; 3] = [
    ChartDefinition {
        key: "items_sold",
        label: "Items Sold",
        order: "desc",
        orderby: "items_sold",
        value_type: ValueType::Number,
    },
    ChartDefinition {
        key: "net_revenue",
        label: "Net Revenue",
        order: "desc",
        orderby: "net_revenue",
        value_type: ValueType::Currency,
    },
    ChartDefinition {
        key: "orders_count",
        label: "Orders",
        order: "desc",
        orderby: "orders_count",
        value_type: ValueType::Number,
    },
];

fn always(_: &ReportQuery) -> bool {
    true
}

fn single_variable_product(query: &ReportQuery) -> bool {
    query.text("filter") == Some("single_product")
        && query.text("products").is_some()
        && query.is_truthy("is-variable")
}

pub fn filters() -> Vec<FilterConfig> {
    let show = FilterConfig {
        param: "filter".to_string(),
        show_filters: always,
        filters: vec![
            FilterOption::new("All Products", "all"),
            FilterOption::new("Single Product", "select_product")
                .chart_mode(ChartMode::ItemComparison)
                .sub_filters(vec![FilterOption::new("Single Product", "single_product")
                    .chart_mode(ChartMode::ItemComparison)
                    .search(SearchType::Products, "products")]),
            FilterOption::new("Comparison", "compare-products")
                .chart_mode(ChartMode::ItemComparison)
                .search(SearchType::Products, "products"),
        ],
    };

    let variations = FilterConfig {
        param: "filter-variations".to_string(),
        show_filters: single_variable_product,
        filters: vec![
            FilterOption::new("All Variations", "all").chart_mode(ChartMode::ItemComparison),
            FilterOption::new("Comparison", "compare-variations")
                .chart_mode(ChartMode::ItemComparison)
                .search(SearchType::Variations, "variations"),
        ],
    };

    vec![show, variations]
}

/// What the item-comparison chart segments by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareObject {
    Products,
    Variations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartMeta {
    pub is_product_details_view: bool,
    pub compare_object: CompareObject,
    pub items_label: &'static str,
    pub mode: ChartMode,
}

pub fn is_single_product_view(query: &ReportQuery) -> bool {
    query.values("products").len() == 1
}

/// Chart settings of the products report for `query`.
pub fn chart_meta(query: &ReportQuery, single_variable: bool) -> ChartMeta {
    let single_product_view = is_single_product_view(query);
    let is_product_details_view = matches!(query.text("filter"), Some("top_items" | "top_sales"))
        || query.values("products").len() > 1;

    let mode = if is_product_details_view || single_product_view {
        ChartMode::ItemComparison
    } else {
        ChartMode::TimeComparison
    };

    let variations = single_product_view && single_variable;

    ChartMeta {
        is_product_details_view,
        compare_object: if variations {
            CompareObject::Variations
        } else {
            CompareObject::Products
        },
        items_label: if variations {
            "%s variations"
        } else {
            "%s products"
        },
        mode,
    }
}
