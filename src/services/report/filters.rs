use serde::{Deserialize, Serialize};

use super::query::{QueryValue, ReportQuery};
use crate::services::search::SearchType;

/// Value a filter parameter takes when the query does not carry it.
pub const DEFAULT_FILTER: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartMode {
    ItemComparison,
    TimeComparison,
}

/// Search box attached to a filter option; `param` is the query key holding its selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    pub search_type: SearchType,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
    pub chart_mode: Option<ChartMode>,
    pub settings: Option<FilterSettings>,
    pub sub_filters: Vec<FilterOption>,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            chart_mode: None,
            settings: None,
            sub_filters: Vec::new(),
        }
    }

    pub fn chart_mode(mut self, mode: ChartMode) -> Self {
        self.chart_mode = Some(mode);
        self
    }

    pub fn search(mut self, search_type: SearchType, param: impl Into<String>) -> Self {
        self.settings = Some(FilterSettings {
            search_type,
            param: param.into(),
        });
        self
    }

    pub fn sub_filters(mut self, sub_filters: Vec<FilterOption>) -> Self {
        self.sub_filters = sub_filters;
        self
    }
}

/// One "Show" dropdown of a report.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Query key holding the selected option value.
    pub param: String,
    pub show_filters: fn(&ReportQuery) -> bool,
    pub filters: Vec<FilterOption>,
}

/// Options of a nested tree in display order, each followed by its sub-filters.
pub fn flatten_filters(filters: &[FilterOption]) -> Vec<&FilterOption> {
    let mut flat = Vec::new();
    for filter in filters {
        flat.push(filter);
        flat.extend(flatten_filters(&filter.sub_filters));
    }
    flat
}

/// Finds the option selected by `query`, scanning the configs from last to first.
///
/// A config is skipped when it is not shown for the query, or when its selected
/// option needs a search parameter the query does not carry. The first config
/// that is not skipped decides, even if none of its options matches. A list
/// valued parameter never names an option.
pub fn selected_filter<'a>(
    filters: &'a [FilterConfig],
    query: &ReportQuery,
) -> Option<&'a FilterOption> {
    for config in filters.iter().rev() {
        if !(config.show_filters)(query) {
            continue;
        }

        let selected = match query.get(&config.param) {
            Some(QueryValue::List(_)) => None,
            _ => {
                let value = query.text(&config.param).unwrap_or(DEFAULT_FILTER);
                flatten_filters(&config.filters)
                    .into_iter()
                    .find(|option| option.value == value)
            }
        };

        let required_param = selected
            .and_then(|option| option.settings.as_ref())
            .map(|settings| settings.param.as_str())
            .filter(|param| !param.is_empty());

        match required_param {
            Some(param) if !query.contains_key(param) => continue,
            _ => return selected,
        }
    }

    None
}

/// Chart mode requested by the selected filter, if any.
pub fn resolve_chart_mode(filters: &[FilterConfig], query: &ReportQuery) -> Option<ChartMode> {
    selected_filter(filters, query).and_then(|option| option.chart_mode)
}
