//! Management handlers: category/product CRUD and key inventory.
//!
//! Every endpoint requires the `admin` role via [`RequireAdmin`]. These are
//! the mutation paths that feed the key inventory, so each one funnels
//! through the repository methods that recompute the derived product
//! counters.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use nexus_core::error::CoreError;
use nexus_core::slug::slugify;
use nexus_core::types::DbId;
use nexus_db::models::category::{CreateCategory, UpdateCategory};
use nexus_db::models::product::{CreateProduct, UpdateProduct};
use nexus_db::models::product_key::{CreateProductKey, ImportProductKeys, UpdateProductKey};
use nexus_db::repositories::{CategoryRepo, ProductKeyRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::media;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Resolve the final slug for a create payload: explicit slug wins,
/// otherwise it is derived from the name.
fn resolve_slug(explicit: Option<&str>, name: &str) -> AppResult<String> {
    match explicit {
        Some(slug) if !slug.is_empty() => Ok(slug.to_string()),
        _ => slugify(name).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Cannot derive a slug from name '{name}'"
            )))
        }),
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/categories
pub async fn list_categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let categories = CategoryRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: categories }))
}

/// POST /api/v1/admin/categories
pub async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<impl IntoResponse> {
    if input.name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Category name must not be empty".into(),
        )));
    }
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let category = CategoryRepo::create(&state.pool, &input, &slug).await?;

    tracing::info!(category_id = category.id, user_id = admin.user_id, "Category created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// PUT /api/v1/admin/categories/{id}
pub async fn update_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<impl IntoResponse> {
    let category = CategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }))?;

    tracing::info!(category_id = id, user_id = admin.user_id, "Category updated");

    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/v1/admin/categories/{id}
///
/// Cascades to the category's products and their keys.
pub async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = CategoryRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }));
    }

    tracing::info!(category_id = id, user_id = admin.user_id, "Category deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/products
pub async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateProduct>,
) -> AppResult<impl IntoResponse> {
    if input.name.is_empty() || input.code.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Product name and code must not be empty".into(),
        )));
    }
    if input.price_cents < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "Price must not be negative".into(),
        )));
    }
    CategoryRepo::find_by_id(&state.pool, input.category_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id: input.category_id,
        }))?;
    let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
    let product = ProductRepo::create(&state.pool, &input, &slug).await?;

    tracing::info!(product_id = product.id, user_id = admin.user_id, "Product created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: product })))
}

/// PUT /api/v1/admin/products/{id}
pub async fn update_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProduct>,
) -> AppResult<impl IntoResponse> {
    if matches!(input.price_cents, Some(p) if p < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "Price must not be negative".into(),
        )));
    }
    let product = ProductRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }))?;

    tracing::info!(product_id = id, user_id = admin.user_id, "Product updated");

    Ok(Json(DataResponse { data: product }))
}

/// DELETE /api/v1/admin/products/{id}
pub async fn delete_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = ProductRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }));
    }

    tracing::info!(product_id = id, user_id = admin.user_id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/products/{id}/image
///
/// Multipart product image upload (field name `image`), stored under the
/// `products/` media prefix.
pub async fn upload_product_image(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("image.png").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'image' field".into()))?;

    let path = media::save_upload(
        &state.config.media_root,
        media::PRODUCTS_PREFIX,
        &filename,
        &data,
    )
    .await
    .map_err(|e| match e {
        media::MediaError::UnsupportedExtension(ext) => {
            AppError::BadRequest(format!("Unsupported image extension: {ext}"))
        }
        media::MediaError::Io(e) => AppError::Internal(format!("Image write failed: {e}")),
    })?;

    let updated = ProductRepo::update_image(&state.pool, id, &path).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }));
    }

    let product = ProductRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }))?;

    tracing::info!(product_id = id, user_id = admin.user_id, path, "Product image uploaded");

    Ok(Json(DataResponse { data: product }))
}

// ---------------------------------------------------------------------------
// Key inventory
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/products/{id}/keys
pub async fn list_keys(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let keys = ProductKeyRepo::list_by_product(&state.pool, product_id).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// POST /api/v1/admin/products/{id}/keys
///
/// Create a single key for a product.
pub async fn create_key(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
    Json(input): Json<CreateProductKey>,
) -> AppResult<impl IntoResponse> {
    if input.key_value.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Key value must not be empty".into(),
        )));
    }
    ensure_product_exists(&state, product_id).await?;

    let key = ProductKeyRepo::create(&state.pool, product_id, &input.key_value).await?;

    tracing::info!(product_id, key_id = key.id, user_id = admin.user_id, "Key created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: key })))
}

/// POST /api/v1/admin/products/{id}/keys/import
///
/// Bulk key import. All-or-nothing: a duplicate value anywhere in the
/// batch fails the whole import with 409.
pub async fn import_keys(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(product_id): Path<DbId>,
    Json(input): Json<ImportProductKeys>,
) -> AppResult<impl IntoResponse> {
    if input.key_values.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "key_values must not be empty".into(),
        )));
    }
    if input.key_values.iter().any(|v| v.is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "Key values must not be empty".into(),
        )));
    }
    ensure_product_exists(&state, product_id).await?;

    let keys = ProductKeyRepo::import(&state.pool, product_id, &input.key_values).await?;

    tracing::info!(
        product_id,
        count = keys.len(),
        user_id = admin.user_id,
        "Keys imported",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: keys })))
}

/// PUT /api/v1/admin/keys/{id}
///
/// Legacy sold-state toggle; `is_active` follows as `NOT is_sold`.
pub async fn update_key(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProductKey>,
) -> AppResult<impl IntoResponse> {
    let Some(is_sold) = input.is_sold else {
        return Err(AppError::Core(CoreError::Validation(
            "is_sold is required".into(),
        )));
    };

    let key = ProductKeyRepo::set_sold_state(&state.pool, id, is_sold)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProductKey",
            id,
        }))?;

    tracing::info!(key_id = id, is_sold, user_id = admin.user_id, "Key updated");

    Ok(Json(DataResponse { data: key }))
}

/// DELETE /api/v1/admin/keys/{id}
///
/// Delete an unsold key. Sold keys are never deleted by normal flow and
/// yield 409.
pub async fn delete_key(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let key = ProductKeyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProductKey",
            id,
        }))?;

    if key.is_sold {
        return Err(AppError::Core(CoreError::Conflict(
            "Sold keys cannot be deleted".into(),
        )));
    }

    // Re-checked atomically inside the delete.
    let deleted = ProductKeyRepo::delete_unsold(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::Conflict(
            "Key was sold concurrently".into(),
        )));
    }

    tracing::info!(key_id = id, user_id = admin.user_id, "Key deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// 404 for key operations against a product id that does not exist.
async fn ensure_product_exists(state: &AppState, product_id: DbId) -> AppResult<()> {
    ProductRepo::find_by_id(&state.pool, product_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id: product_id,
        }))?;
    Ok(())
}
