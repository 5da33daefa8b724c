use serde::{Deserialize, Serialize};

/// Parameters shared by `ListModels` and `ListEndpoints`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl ListQuery {
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            next_token: token,
            ..self.clone()
        }
    }
}

/// A single list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when the service has more results.
    pub next_token: Option<String>,
    pub request_id: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self {
            items,
            next_token,
            request_id: None,
        }
    }
}

/// Every page of a listing folded together, in service order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub request_ids: Vec<String>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            request_ids: Vec::new(),
        }
    }
}

impl<T> Collected<T> {
    /// Append a page and hand back its continuation token.
    pub fn absorb(&mut self, page: Page<T>) -> Option<String> {
        self.pages += 1;
        if let Some(id) = page.request_id {
            self.request_ids.push(id);
        }
        self.items.extend(page.items);
        page.next_token
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
