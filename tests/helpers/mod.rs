//! Shared fixtures: a scripted in-memory [`CatalogApi`].
#![allow(dead_code)]

use async_trait::async_trait;
use parts_catalog::catalog::{CatalogApi, CatalogApiError, CatalogQuery, CatalogResponse, Item, ItemId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Which request a scripted reply answers: the search term (if any) plus the
/// cursor (if any). Filters are not part of the route; script replies in the
/// order the test issues requests instead.
pub fn route(search: Option<&str>, cursor: Option<&str>) -> String {
    format!("{}|{}", search.unwrap_or(""), cursor.unwrap_or(""))
}

fn route_of(query: &CatalogQuery) -> String {
    route(
        query.search.as_ref().map(|(_, term)| term.as_str()),
        query.cursor.as_deref(),
    )
}

enum Reply {
    Page(CatalogResponse),
    Fail(u16),
}

struct Scripted {
    reply: Reply,
    gate: Option<Arc<Notify>>,
}

#[derive(Default)]
pub struct FakeCatalogApi {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<CatalogQuery>>,
    details: Mutex<HashMap<ItemId, Item>>,
    detail_calls: Mutex<usize>,
}

impl FakeCatalogApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, route: String, scripted: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(route)
            .or_default()
            .push_back(scripted);
    }

    /// Queue a page for the next request on `route`.
    pub fn reply(&self, route: String, items: &[Item], next_cursor: Option<&str>) {
        let response = CatalogResponse::page(items, next_cursor, Some(next_cursor.is_some()));
        self.reply_raw(route, response);
    }

    pub fn reply_raw(&self, route: String, response: CatalogResponse) {
        self.push(
            route,
            Scripted {
                reply: Reply::Page(response),
                gate: None,
            },
        );
    }

    /// Queue a page that is only delivered once the returned gate is notified.
    pub fn reply_gated(
        &self,
        route: String,
        items: &[Item],
        next_cursor: Option<&str>,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(
            route,
            Scripted {
                reply: Reply::Page(CatalogResponse::page(
                    items,
                    next_cursor,
                    Some(next_cursor.is_some()),
                )),
                gate: Some(gate.clone()),
            },
        );
        gate
    }

    /// Queue an HTTP failure for the next request on `route`.
    pub fn fail(&self, route: String, status: u16) {
        self.push(
            route,
            Scripted {
                reply: Reply::Fail(status),
                gate: None,
            },
        );
    }

    pub fn add_details(&self, details: Vec<Item>) {
        let mut map = self.details.lock().unwrap();
        for item in details {
            map.insert(item.id().clone(), item);
        }
    }

    pub fn calls(&self) -> Vec<CatalogQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn detail_calls(&self) -> usize {
        *self.detail_calls.lock().unwrap()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalogApi {
    async fn list_items(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogApiError> {
        self.calls.lock().unwrap().push(query.clone());
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&route_of(query))
            .and_then(VecDeque::pop_front);

        // Unscripted requests get an empty final page.
        let Some(scripted) = scripted else {
            return Ok(CatalogResponse::page(&[], None, Some(false)));
        };
        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        match scripted.reply {
            Reply::Page(response) => Ok(response),
            Reply::Fail(status) => Err(CatalogApiError::Status {
                status,
                url: "https://catalog.test/items".to_owned(),
                body: "upstream unavailable".to_owned(),
            }),
        }
    }

    async fn item_details(&self, ids: &[ItemId]) -> Result<Vec<Item>, CatalogApiError> {
        *self.detail_calls.lock().unwrap() += 1;
        let details = self.details.lock().unwrap();
        Ok(ids.iter().filter_map(|id| details.get(id).cloned()).collect())
    }
}

/// `count` items with ids `{prefix}-{n}` and matching names.
pub fn make_items(prefix: &str, count: usize) -> Vec<Item> {
    (1..=count)
        .map(|n| {
            let id = format!("{prefix}-{n}");
            Item::named(id.clone(), &format!("{prefix} part {n}"))
        })
        .collect()
}

pub fn ids(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.id().as_str().to_owned()).collect()
}

/// Let spawned tasks run until the fake has seen `count` list requests.
pub async fn wait_for_calls(api: &FakeCatalogApi, count: usize) {
    for _ in 0..1000 {
        if api.call_count() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {count} catalog calls, saw {}",
        api.call_count()
    );
}
