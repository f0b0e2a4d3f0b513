use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::ReportError;

const DEFAULT_LIMIT: i64 = 10;

/// Entity kinds the admin search box can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    Categories,
    Countries,
    Coupons,
    Customers,
    DownloadIps,
    Emails,
    Orders,
    Products,
    Taxes,
    Usernames,
    Variations,
}

impl SearchType {
    pub const ALL: [SearchType; 11] = [
        SearchType::Categories,
        SearchType::Countries,
        SearchType::Coupons,
        SearchType::Customers,
        SearchType::DownloadIps,
        SearchType::Emails,
        SearchType::Orders,
        SearchType::Products,
        SearchType::Taxes,
        SearchType::Usernames,
        SearchType::Variations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Categories => "categories",
            SearchType::Countries => "countries",
            SearchType::Coupons => "coupons",
            SearchType::Customers => "customers",
            SearchType::DownloadIps => "downloadIps",
            SearchType::Emails => "emails",
            SearchType::Orders => "orders",
            SearchType::Products => "products",
            SearchType::Taxes => "taxes",
            SearchType::Usernames => "usernames",
            SearchType::Variations => "variations",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ReportError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| ReportError::UnknownSearchType(value.to_string()))
    }

    pub fn capability(&self) -> &'static SearchCapability {
        // CAPABILITIES is laid out in ALL order
        &CAPABILITIES[*self as usize]
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SearchRow {
    pub id: String,
    pub name: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub label: String,
}

/// How one entity type is fetched and displayed.
///
/// Every query takes `$1` as an ILIKE pattern and `$2` as the row limit, and
/// returns `id`, `name` and `detail` columns.
pub struct SearchCapability {
    pub search_type: SearchType,
    pub sql: &'static str,
    pub label: fn(&SearchRow) -> String,
}

fn name_label(row: &SearchRow) -> String {
    row.name.clone()
}

fn variation_label(row: &SearchRow) -> String {
    match row.detail.as_deref() {
        Some(attributes) if !attributes.is_empty() => format!("{} - {}", row.name, attributes),
        _ => row.name.clone(),
    }
}

fn customer_label(row: &SearchRow) -> String {
    let name = row.name.trim();
    match row.detail.as_deref() {
        _ if !name.is_empty() => name.to_string(),
        Some(email) => email.to_string(),
        None => row.id.clone(),
    }
}

fn order_label(row: &SearchRow) -> String {
    format!("Order #{}", row.name)
}

fn tax_label(row: &SearchRow) -> String {
    match row.detail.as_deref() {
        Some(rate) => format!("{} ({}%)", row.name, rate),
        None => row.name.clone(),
    }
}

static CAPABILITIES: [SearchCapability; 11] = [
    SearchCapability {
        search_type: SearchType::Categories,
        sql: "SELECT id::TEXT AS id, name, NULL::TEXT AS detail FROM product_categories \
              WHERE name ILIKE $1 ORDER BY name LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Countries,
        sql: "SELECT code AS id, name, NULL::TEXT AS detail FROM countries \
              WHERE name ILIKE $1 OR code ILIKE $1 ORDER BY name LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Coupons,
        sql: "SELECT id::TEXT AS id, code AS name, NULL::TEXT AS detail FROM coupons \
              WHERE code ILIKE $1 ORDER BY code LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Customers,
        sql: "SELECT id::TEXT AS id, \
                     concat_ws(' ', first_name, last_name) AS name, email AS detail \
              FROM customers \
              WHERE concat_ws(' ', first_name, last_name) ILIKE $1 OR email ILIKE $1 \
              ORDER BY last_name, first_name LIMIT $2",
        label: customer_label,
    },
    SearchCapability {
        search_type: SearchType::DownloadIps,
        sql: "SELECT DISTINCT ip_address AS id, ip_address AS name, NULL::TEXT AS detail \
              FROM download_log WHERE ip_address ILIKE $1 ORDER BY ip_address LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Emails,
        sql: "SELECT id::TEXT AS id, email AS name, NULL::TEXT AS detail FROM customers \
              WHERE email ILIKE $1 ORDER BY email LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Orders,
        sql: "SELECT order_id::TEXT AS id, order_id::TEXT AS name, status AS detail \
              FROM order_stats WHERE order_id::TEXT ILIKE $1 \
              ORDER BY order_id DESC LIMIT $2",
        label: order_label,
    },
    SearchCapability {
        search_type: SearchType::Products,
        sql: "SELECT id::TEXT AS id, name, sku AS detail FROM products \
              WHERE parent_id IS NULL AND (name ILIKE $1 OR sku ILIKE $1) \
              ORDER BY name LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Taxes,
        sql: "SELECT id::TEXT AS id, code AS name, rate::TEXT AS detail FROM tax_rates \
              WHERE code ILIKE $1 ORDER BY code LIMIT $2",
        label: tax_label,
    },
    SearchCapability {
        search_type: SearchType::Usernames,
        sql: "SELECT id::TEXT AS id, username AS name, NULL::TEXT AS detail FROM customers \
              WHERE username ILIKE $1 ORDER BY username LIMIT $2",
        label: name_label,
    },
    SearchCapability {
        search_type: SearchType::Variations,
        sql: "SELECT v.id::TEXT AS id, p.name AS name, v.attribute_summary AS detail \
              FROM products v JOIN products p ON p.id = v.parent_id \
              WHERE p.name ILIKE $1 OR v.attribute_summary ILIKE $1 \
              ORDER BY p.name, v.id LIMIT $2",
        label: variation_label,
    },
];

pub async fn search(
    pool: &PgPool,
    search_type: SearchType,
    term: &str,
    limit: Option<i64>,
) -> Result<Vec<SearchResult>, ReportError> {
    let capability = search_type.capability();
    let pattern = format!("%{}%", term.trim());
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);

    let rows = sqlx::query_as::<_, SearchRow>(capability.sql)
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| SearchResult {
            id: row.id.clone(),
            label: (capability.label)(row),
        })
        .collect())
}

/// An entry already picked in a search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Adds `item` unless its id is already selected.
pub fn select_result(selected: &[SelectedItem], item: SelectedItem) -> Option<Vec<SelectedItem>> {
    if selected.iter().any(|s| s.id == item.id) {
        return None;
    }
    let mut next = selected.to_vec();
    next.push(item);
    Some(next)
}

pub fn remove_result(selected: &[SelectedItem], id: &str) -> Vec<SelectedItem> {
    selected.iter().filter(|s| s.id != id).cloned().collect()
}

/// Screen reader text for each labelled tag, e.g. `Hoodie (1 of 3)`.
pub fn tag_labels(selected: &[SelectedItem]) -> Vec<String> {
    let total = selected.len();
    selected
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let label = item.label.as_deref().filter(|l| !l.is_empty())?;
            Some(format!("{} ({} of {})", label, i + 1, total))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, label: Option<&str>) -> SelectedItem {
        SelectedItem {
            id: id.to_string(),
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn every_type_parses_and_maps_to_its_own_capability() {
        for search_type in SearchType::ALL {
            assert_eq!(SearchType::parse(search_type.as_str()).unwrap(), search_type);
            assert_eq!(search_type.capability().search_type, search_type);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            SearchType::parse("widgets"),
            Err(ReportError::UnknownSearchType(t)) if t == "widgets"
        ));
    }

    #[test]
    fn labels_per_type() {
        let row = SearchRow {
            id: "41".to_string(),
            name: "Hoodie".to_string(),
            detail: Some("Blue, Large".to_string()),
        };
        assert_eq!((SearchType::Variations.capability().label)(&row), "Hoodie - Blue, Large");
        assert_eq!((SearchType::Products.capability().label)(&row), "Hoodie");
        assert_eq!((SearchType::Orders.capability().label)(&row), "Order #Hoodie");

        let nameless = SearchRow {
            id: "3".to_string(),
            name: " ".to_string(),
            detail: Some("jo@example.com".to_string()),
        };
        assert_eq!((SearchType::Customers.capability().label)(&nameless), "jo@example.com");
    }

    #[test]
    fn selecting_twice_is_a_no_op() {
        let selected = vec![item("1", Some("Cap"))];
        assert_eq!(select_result(&selected, item("1", Some("Cap"))), None);

        let next = select_result(&selected, item("2", Some("Hoodie"))).unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[1].id, "2");
    }

    #[test]
    fn removing_drops_only_that_id() {
        let selected = vec![item("1", None), item("2", None), item("3", None)];
        let ids: Vec<String> = remove_result(&selected, "2").into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn tags_count_every_selection() {
        let selected = vec![item("1", Some("Cap")), item("2", None), item("3", Some("Hoodie"))];
        assert_eq!(tag_labels(&selected), vec!["Cap (1 of 3)", "Hoodie (3 of 3)"]);
    }
}
