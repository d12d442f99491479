//! Product catalog listing (read-only).

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::config::ServerCfg;

/// One product row as returned by the API.
#[derive(Clone, Debug, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

/// One page of the product listing.
#[derive(Clone, Debug, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

/// Fetch one page of products.
pub async fn fetch_page(
    http: &Client,
    server: &ServerCfg,
    page: u32,
    per_page: u32,
) -> Result<ProductPage> {
    let resp = http
        .get(server.url(&server.products_path))
        .query(&[("page", page), ("per_page", per_page)])
        .send()
        .await?
        .error_for_status()?
        .json::<ProductPage>()
        .await?;

    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_fetch_first_page() {
        async fn products(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            Json(json!({
                "items": [
                    {"id": 1, "sku": "A-1", "name": "Widget", "description": null, "active": true,
                     "created_at": "2024-01-01T00:00:00", "updated_at": "2024-01-01T00:00:00"}
                ],
                "total": 1,
                "page": q.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(0),
                "pages": 1,
                "per_page": q.get("per_page").cloned(),
            }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/api/products", get(products)))
                .await
                .unwrap();
        });

        let mut server = Config::default().server;
        server.base_url = format!("http://{addr}");
        let page = fetch_page(&Client::new(), &server, 1, 20).await.unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].sku, "A-1");
        assert!(page.items[0].description.is_none());
    }
}
