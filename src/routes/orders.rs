use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::dsl::exists;
use diesel::{prelude::*, select};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, Order};
use crate::schema::{cars, clients, orders};
use crate::state::AppState;

use super::cars::CAR_STATUS_DELETED;
use super::to_iso;

pub const ORDER_STATUSES: &[&str] = &["OPEN", "APPROVED", "CLOSED", "CANCELED"];
pub const ORDER_STATUS_OPEN: &str = "OPEN";
const ORDER_STATUS_CANCELED: &str = "CANCELED";

const UPDATABLE_FIELDS: &[&str] = &["status", "zipcode", "city", "state", "totalValue"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub car_id: Uuid,
    pub client_id: Uuid,
    pub zipcode: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub total_value: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub client_cpf: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub car_id: Uuid,
    pub client_id: Uuid,
    pub status: String,
    pub zipcode: String,
    pub city: String,
    pub state: String,
    pub total_value: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = orders)]
struct UpdateOrderChangeset {
    status: Option<String>,
    zipcode: Option<String>,
    city: Option<String>,
    state: Option<String>,
    total_value: Option<f64>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    let mut conn = state.db()?;

    let car_available: bool = select(exists(
        cars::table
            .filter(cars::id.eq(payload.car_id))
            .filter(cars::status.ne(CAR_STATUS_DELETED)),
    ))
    .get_result(&mut conn)?;
    if !car_available {
        return Err(AppError::bad_request("Carro não encontrado"));
    }

    let client_available: bool = select(exists(
        clients::table
            .filter(clients::id.eq(payload.client_id))
            .filter(clients::deleted_at.is_null()),
    ))
    .get_result(&mut conn)?;
    if !client_available {
        return Err(AppError::bad_request("Cliente não encontrado"));
    }

    let new_order = NewOrder {
        id: Uuid::new_v4(),
        car_id: payload.car_id,
        client_id: payload.client_id,
        status: ORDER_STATUS_OPEN.to_string(),
        zipcode: payload.zipcode,
        city: payload.city,
        state: payload.state,
        total_value: payload.total_value,
    };

    diesel::insert_into(orders::table)
        .values(&new_order)
        .execute(&mut conn)
        .map_err(|err| AppError::internal("Erro ao criar pedido", err))?;

    let order: Order = orders::table.find(new_order.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(build_response(order))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListQuery>,
) -> AppResult<Json<OrderListResponse>> {
    let mut conn = state.db()?;

    let mut query = orders::table.into_boxed();

    if let Some(status) = params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(orders::status.eq(status.to_string()));
    }
    if let Some(cpf) = params
        .client_cpf
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let matching_clients = clients::table
            .filter(clients::cpf.eq(cpf.to_string()))
            .select(clients::id);
        query = query.filter(orders::client_id.eq_any(matching_clients));
    }
    if let Some(start) = params.start_date {
        query = query.filter(orders::created_at.ge(start.and_time(NaiveTime::MIN)));
    }
    if let Some(end) = params.end_date {
        // inclusive upper bound: everything strictly before the next day
        let next_day = end.succ_opt().unwrap_or(end);
        query = query.filter(orders::created_at.lt(next_day.and_time(NaiveTime::MIN)));
    }

    let sort = params.sort.as_deref().unwrap_or("createdAt");
    let ascending = params.order.as_deref() == Some("asc");
    query = order_orders(query, sort, ascending)
        .ok_or_else(|| AppError::bad_request("Parâmetro sort inválido."))?;

    let all: Vec<Order> = query
        .load(&mut conn)
        .map_err(|err| AppError::internal("Erro ao listar pedidos", err))?;

    let total = all.len() as i64;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).max(1);
    let start = ((page - 1) * limit) as usize;
    let orders_page = all
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .map(build_response)
        .collect();

    Ok(Json(OrderListResponse {
        orders: orders_page,
        total,
        page,
        limit,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let mut conn = state.db()?;

    let order: Order = orders::table
        .find(order_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Pedido não encontrado"))?;

    Ok(Json(build_response(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> AppResult<Json<OrderResponse>> {
    let errors = validate_update(&payload);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let mut conn = state.db()?;

    let exists_row: bool = select(exists(orders::table.filter(orders::id.eq(order_id))))
        .get_result(&mut conn)?;
    if !exists_row {
        return Err(AppError::bad_request("Pedido não encontrado"));
    }

    let changeset = UpdateOrderChangeset {
        status: payload
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string),
        zipcode: payload
            .get("zipcode")
            .and_then(Value::as_str)
            .map(str::to_string),
        city: payload
            .get("city")
            .and_then(Value::as_str)
            .map(str::to_string),
        state: payload
            .get("state")
            .and_then(Value::as_str)
            .map(str::to_string),
        total_value: payload.get("totalValue").and_then(Value::as_f64),
    };

    let now = Utc::now().naive_utc();
    diesel::update(orders::table.find(order_id))
        .set((&changeset, orders::updated_at.eq(now)))
        .execute(&mut conn)?;

    let order: Order = orders::table.find(order_id).first(&mut conn)?;
    Ok(Json(build_response(order)))
}

/// Deleting an order is a state transition, not a row removal.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let mut conn = state.db()?;

    let exists_row: bool = select(exists(orders::table.filter(orders::id.eq(order_id))))
        .get_result(&mut conn)?;
    if !exists_row {
        return Err(AppError::bad_request("Pedido não encontrado"));
    }

    let now = Utc::now().naive_utc();
    diesel::update(orders::table.find(order_id))
        .set((
            orders::status.eq(ORDER_STATUS_CANCELED),
            orders::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let order: Order = orders::table.find(order_id).first(&mut conn)?;
    Ok(Json(build_response(order)))
}

/// Whole-payload validation: every problem is collected so the caller sees
/// the full list in one round trip.
fn validate_update(payload: &Value) -> Vec<String> {
    let Some(object) = payload.as_object() else {
        return vec!["O corpo da requisição deve ser um objeto.".to_string()];
    };

    let mut errors = Vec::new();
    for key in object.keys() {
        if !UPDATABLE_FIELDS.contains(&key.as_str()) {
            errors.push(format!("Campo não permitido: {key}"));
        }
    }

    if let Some(status) = object.get("status") {
        match status.as_str() {
            Some(value) if ORDER_STATUSES.contains(&value) => {}
            _ => errors.push("Status deve ser OPEN, APPROVED, CLOSED ou CANCELED.".to_string()),
        }
    }
    for field in ["zipcode", "city", "state"] {
        if let Some(value) = object.get(field) {
            if !value.is_string() {
                errors.push(format!("O campo {field} deve ser uma string."));
            }
        }
    }
    if let Some(value) = object.get("totalValue") {
        if !value.is_number() {
            errors.push("O campo totalValue deve ser um número.".to_string());
        }
    }

    errors
}

fn order_orders<'a>(
    query: orders::BoxedQuery<'a, diesel::pg::Pg>,
    sort: &str,
    ascending: bool,
) -> Option<orders::BoxedQuery<'a, diesel::pg::Pg>> {
    let ordered = match (sort, ascending) {
        ("createdAt", true) => query.order(orders::created_at.asc()),
        ("createdAt", false) => query.order(orders::created_at.desc()),
        ("status", true) => query.order(orders::status.asc()),
        ("status", false) => query.order(orders::status.desc()),
        ("totalValue", true) => query.order(orders::total_value.asc()),
        ("totalValue", false) => query.order(orders::total_value.desc()),
        ("city", true) => query.order(orders::city.asc()),
        ("city", false) => query.order(orders::city.desc()),
        ("state", true) => query.order(orders::state.asc()),
        ("state", false) => query.order(orders::state.desc()),
        _ => return None,
    };
    Some(ordered)
}

fn build_response(order: Order) -> OrderResponse {
    OrderResponse {
        id: order.id,
        car_id: order.car_id,
        client_id: order.client_id,
        status: order.status,
        zipcode: order.zipcode,
        city: order.city,
        state: order.state,
        total_value: order.total_value,
        created_at: to_iso(order.created_at),
        updated_at: to_iso(order.updated_at),
    }
}
