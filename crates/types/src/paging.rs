use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort descriptor carried in paginated responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: String,
}

/// Paging envelope of a list response: `{page, count, total, sort}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingEnvelope {
    pub page: i64,
    pub count: i64,
    pub total: i64,
    pub sort: SortSpec,
}

impl PagingEnvelope {
    /// Extract the envelope when all four keys are present on an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let page = map.get("page")?.as_i64()?;
        let count = map.get("count")?.as_i64()?;
        let total = map.get("total")?.as_i64()?;
        let sort = map.get("sort")?;
        Some(Self {
            page,
            count,
            total,
            sort: SortSpec {
                field: scalar_text(sort.get("field")),
                order: scalar_text(sort.get("order")),
            },
        })
    }

    /// The four header lines textual renderers print before the body.
    pub fn header_lines(&self) -> [String; 4] {
        [
            format!("Page: {}", self.page),
            format!("Count: {}", self.count),
            format!("Total: {}", self.total),
            format!("Order: {} {}", self.sort.field, self.sort.order),
        ]
    }
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Paging flags a list command sends to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Page size. `-1` asks for everything at once; below `-1` the absolute
    /// value is used as page size and every page is fetched.
    pub size: i64,
    pub page: i64,
    pub field: String,
    pub order: String,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            size: 20,
            page: 0,
            field: "id".to_string(),
            order: "DESC".to_string(),
        }
    }
}

impl PageQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("size".to_string(), self.size.to_string()),
            ("page".to_string(), self.page.to_string()),
            ("field".to_string(), self.field.clone()),
            ("order".to_string(), self.order.clone()),
        ]
    }
}
