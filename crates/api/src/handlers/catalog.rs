//! Handlers for the public storefront: home, catalog listing, product
//! detail.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use nexus_core::error::CoreError;
use nexus_db::models::category::Category;
use nexus_db::models::product::Product;
use nexus_db::repositories::{CategoryRepo, ProductRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::query::CatalogParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// How many products the landing page shows.
const FEATURED_LIMIT: i64 = 6;

/// Products plus the category list, as the storefront pages render both.
#[derive(Debug, Serialize)]
pub struct CatalogPayload {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// GET /api/v1/
///
/// Storefront home: newest available products and all categories.
pub async fn home(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let products = ProductRepo::list_featured(&state.pool, FEATURED_LIMIT).await?;
    let categories = CategoryRepo::list(&state.pool).await?;

    Ok(Json(DataResponse {
        data: CatalogPayload {
            products,
            categories,
        },
    }))
}

/// GET /api/v1/catalog
///
/// Available products filtered by category slug and inclusive price bounds
/// (cents), sorted by `price_asc` | `price_desc` | `new` (default:
/// newest first).
pub async fn list_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter();
    let products = ProductRepo::list_catalog(&state.pool, &filter).await?;
    let categories = CategoryRepo::list(&state.pool).await?;

    Ok(Json(DataResponse {
        data: CatalogPayload {
            products,
            categories,
        },
    }))
}

/// GET /api/v1/products/{slug}
pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Product>>> {
    let product = ProductRepo::find_by_slug(&state.pool, &slug)
        .await?
        .ok_or(AppError::Core(CoreError::NotFoundByKey {
            entity: "Product",
            key: slug,
        }))?;

    Ok(Json(DataResponse { data: product }))
}
