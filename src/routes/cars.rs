use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::dsl::exists;
use diesel::{prelude::*, result::DatabaseErrorKind, select, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Car, CarItem, NewCar, NewCarItem};
use crate::schema::{car_items, cars, orders};
use crate::state::AppState;

use super::orders::ORDER_STATUS_OPEN;
use super::to_iso;

pub const CAR_STATUSES: &[&str] = &["ACTIVED", "INACTIVED", "DELETED"];
pub const CAR_STATUS_DELETED: &str = "DELETED";

const INVALID_STATUS_MESSAGE: &str = "Status deve ser ACTIVED, INACTIVED ou DELETED.";
const DUPLICATE_PLATE_MESSAGE: &str =
    "Já existe um carro com esta placa com status ativo ou inativo.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarRequest {
    pub plate: String,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub km: i32,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub status: Option<String>,
    #[serde(default, alias = "Items")]
    pub items: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCarRequest {
    pub plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub km: Option<i32>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub status: Option<String>,
    #[serde(default, alias = "Items")]
    pub items: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarListQuery {
    pub brand: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub order_by: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct CarItemResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    pub id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub km: i32,
    pub year: i32,
    pub price: f64,
    pub status: String,
    pub items: Vec<CarItemResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarListResponse {
    pub cars: Vec<CarResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = cars)]
struct UpdateCarChangeset<'a> {
    plate: Option<&'a str>,
    brand: Option<&'a str>,
    model: Option<&'a str>,
    km: Option<i32>,
    year: Option<i32>,
    price: Option<f64>,
    status: Option<&'a str>,
}

pub async fn create_car(
    State(state): State<AppState>,
    Json(payload): Json<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<CarResponse>)> {
    let plate = payload.plate.trim();
    if plate.is_empty() {
        return Err(AppError::bad_request("A placa não pode estar vazia."));
    }
    let brand = payload.brand.trim();
    if brand.is_empty() {
        return Err(AppError::bad_request("A marca não pode estar vazia."));
    }
    let model = payload.model.trim();
    if model.is_empty() {
        return Err(AppError::bad_request("O modelo não pode estar vazio."));
    }

    let year = payload
        .year
        .ok_or_else(|| AppError::bad_request("O ano é obrigatório."))?;
    let price = payload
        .price
        .ok_or_else(|| AppError::bad_request("O preço é obrigatório."))?;

    let status = payload.status.as_deref().unwrap_or("ACTIVED");
    if !CAR_STATUSES.contains(&status) {
        return Err(AppError::bad_request(INVALID_STATUS_MESSAGE));
    }

    let mut conn = state.db()?;

    let duplicate: bool = select(exists(
        cars::table
            .filter(cars::plate.eq(plate))
            .filter(cars::status.ne(CAR_STATUS_DELETED)),
    ))
    .get_result(&mut conn)?;
    if duplicate {
        return Err(AppError::bad_request(DUPLICATE_PLATE_MESSAGE));
    }

    let new_car = NewCar {
        id: Uuid::new_v4(),
        plate: plate.to_string(),
        brand: brand.to_string(),
        model: model.to_string(),
        km: payload.km,
        year,
        price,
        status: status.to_string(),
    };
    let item_rows = item_rows_for(new_car.id, &payload.items);

    let insert = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(cars::table)
            .values(&new_car)
            .execute(conn)?;
        diesel::insert_into(car_items::table)
            .values(&item_rows)
            .execute(conn)?;
        Ok(())
    });
    match insert {
        Ok(()) => {}
        // the partial unique index closes the read-then-write race window
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request(DUPLICATE_PLATE_MESSAGE));
        }
        Err(err) => return Err(AppError::internal("Erro ao criar carro", err)),
    }

    let car: Car = cars::table.find(new_car.id).first(&mut conn)?;
    let items = load_items(&mut conn, car.id)?;
    Ok((StatusCode::CREATED, Json(build_response(car, items))))
}

pub async fn list_cars(
    State(state): State<AppState>,
    Query(params): Query<CarListQuery>,
) -> AppResult<Json<CarListResponse>> {
    let mut conn = state.db()?;

    let mut query = cars::table.into_boxed();

    if let Some(brand) = params.brand.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        query = query.filter(cars::brand.ilike(format!("%{brand}%")));
    }
    if let Some(min_year) = params.min_year {
        query = query.filter(cars::year.ge(min_year));
    }
    if let Some(max_year) = params.max_year {
        query = query.filter(cars::year.le(max_year));
    }
    if let Some(min_price) = params.min_price {
        query = query.filter(cars::price.ge(min_price));
    }
    if let Some(max_price) = params.max_price {
        query = query.filter(cars::price.le(max_price));
    }

    query = match params.order_by.as_deref() {
        Some(raw) => {
            order_cars(query, raw).ok_or_else(|| AppError::bad_request("Parâmetro orderBy inválido."))?
        }
        None => query.order(cars::created_at.asc()),
    };

    let all: Vec<Car> = query
        .load(&mut conn)
        .map_err(|err| AppError::internal("Erro ao listar carros", err))?;

    let total = all.len() as i64;
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(state.config.default_page_size)
        .max(1);
    let start = ((page - 1) * page_size) as usize;
    let page_rows: Vec<Car> = all.into_iter().skip(start).take(page_size as usize).collect();

    if page_rows.is_empty() {
        return Err(AppError::message(
            StatusCode::NOT_FOUND,
            "Nenhum carro encontrado.",
        ));
    }

    let ids: Vec<Uuid> = page_rows.iter().map(|car| car.id).collect();
    let item_rows: Vec<CarItem> = car_items::table
        .filter(car_items::car_id.eq_any(&ids))
        .order((car_items::car_id.asc(), car_items::position.asc()))
        .load(&mut conn)?;

    let mut items_map: HashMap<Uuid, Vec<CarItemResponse>> = HashMap::new();
    for item in item_rows {
        items_map
            .entry(item.car_id)
            .or_default()
            .push(CarItemResponse {
                id: item.id,
                name: item.name,
            });
    }

    let cars_page = page_rows
        .into_iter()
        .map(|car| {
            let items = items_map.remove(&car.id).unwrap_or_default();
            build_response(car, items)
        })
        .collect();

    Ok(Json(CarListResponse {
        cars: cars_page,
        total,
        page,
        page_size,
    }))
}

pub async fn get_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<CarResponse>> {
    let mut conn = state.db()?;

    let car: Car = cars::table
        .find(car_id)
        .first(&mut conn)
        .optional()
        .map_err(|err| AppError::internal("Erro ao buscar carro", err))?
        .ok_or_else(|| AppError::not_found("Carro não encontrado"))?;

    let items = load_items(&mut conn, car.id)?;
    Ok(Json(build_response(car, items)))
}

pub async fn update_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    Json(payload): Json<UpdateCarRequest>,
) -> AppResult<Json<CarResponse>> {
    let mut conn = state.db()?;

    let existing: Car = cars::table
        .find(car_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Carro não encontrado"))?;

    if existing.status == CAR_STATUS_DELETED {
        return Err(AppError::bad_request(
            "Carros com status excluído não podem ser atualizados",
        ));
    }

    if let Some(ref status) = payload.status {
        if !CAR_STATUSES.contains(&status.as_str()) {
            return Err(AppError::bad_request(INVALID_STATUS_MESSAGE));
        }
    }

    let plate = match payload.plate.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("A placa não pode estar vazia.")),
        other => other,
    };
    let brand = match payload.brand.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("A marca não pode estar vazia.")),
        other => other,
    };
    let model = match payload.model.as_deref().map(str::trim) {
        Some("") => return Err(AppError::bad_request("O modelo não pode estar vazio.")),
        other => other,
    };

    if let Some(plate) = plate {
        if plate != existing.plate {
            let duplicate: bool = select(exists(
                cars::table
                    .filter(cars::plate.eq(plate))
                    .filter(cars::status.ne(CAR_STATUS_DELETED))
                    .filter(cars::id.ne(car_id)),
            ))
            .get_result(&mut conn)?;
            if duplicate {
                return Err(AppError::bad_request(DUPLICATE_PLATE_MESSAGE));
            }
        }
    }

    let changeset = UpdateCarChangeset {
        plate,
        brand,
        model,
        km: payload.km,
        year: payload.year,
        price: payload.price,
        status: payload.status.as_deref(),
    };
    let item_rows = payload
        .items
        .as_ref()
        .map(|names| item_rows_for(car_id, names));

    let now = Utc::now().naive_utc();
    let update = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::update(cars::table.find(car_id))
            .set((&changeset, cars::updated_at.eq(now)))
            .execute(conn)?;
        // wholesale replacement: a reader never sees a partial item set
        if let Some(ref rows) = item_rows {
            diesel::delete(car_items::table.filter(car_items::car_id.eq(car_id))).execute(conn)?;
            diesel::insert_into(car_items::table).values(rows).execute(conn)?;
        }
        Ok(())
    });
    match update {
        Ok(()) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request(DUPLICATE_PLATE_MESSAGE));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let car: Car = cars::table.find(car_id).first(&mut conn)?;
    let items = load_items(&mut conn, car.id)?;
    Ok(Json(build_response(car, items)))
}

pub async fn delete_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;

    let existing: Car = cars::table
        .find(car_id)
        .first(&mut conn)
        .optional()
        .map_err(|err| AppError::internal("Erro ao excluir o carro", err))?
        .ok_or_else(|| AppError::message(StatusCode::NOT_FOUND, "Carro inexistente"))?;

    if existing.status == CAR_STATUS_DELETED {
        return Err(AppError::message(
            StatusCode::NOT_FOUND,
            "Este carro já está excluído.",
        ));
    }

    if has_open_orders(&mut conn, car_id)? {
        warn!(%car_id, "car delete blocked by open orders");
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Não é possível excluir o carro. Há pedidos em aberto.",
        ));
    }

    let now = Utc::now().naive_utc();
    diesel::update(cars::table.find(car_id))
        .set((
            cars::status.eq(CAR_STATUS_DELETED),
            cars::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    info!(%car_id, plate = %existing.plate, "car soft-deleted");
    Ok(Json(json!({
        "message": "Carro marcado como 'DELETED' com sucesso"
    })))
}

/// True iff at least one OPEN order still references the car.
pub(crate) fn has_open_orders(conn: &mut PgConnection, car_id: Uuid) -> AppResult<bool> {
    let open: bool = select(exists(
        orders::table
            .filter(orders::car_id.eq(car_id))
            .filter(orders::status.eq(ORDER_STATUS_OPEN)),
    ))
    .get_result(conn)?;
    Ok(open)
}

fn item_rows_for(car_id: Uuid, names: &[String]) -> Vec<NewCarItem> {
    names
        .iter()
        .enumerate()
        .map(|(position, name)| NewCarItem {
            id: Uuid::new_v4(),
            car_id,
            name: name.clone(),
            position: position as i32,
        })
        .collect()
}

fn load_items(conn: &mut PgConnection, car_id: Uuid) -> AppResult<Vec<CarItemResponse>> {
    let rows: Vec<CarItem> = car_items::table
        .filter(car_items::car_id.eq(car_id))
        .order(car_items::position.asc())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|item| CarItemResponse {
            id: item.id,
            name: item.name,
        })
        .collect())
}

fn build_response(car: Car, items: Vec<CarItemResponse>) -> CarResponse {
    CarResponse {
        id: car.id,
        plate: car.plate,
        brand: car.brand,
        model: car.model,
        km: car.km,
        year: car.year,
        price: car.price,
        status: car.status,
        items,
        created_at: to_iso(car.created_at),
        updated_at: to_iso(car.updated_at),
    }
}

fn order_cars<'a>(
    query: cars::BoxedQuery<'a, diesel::pg::Pg>,
    raw: &str,
) -> Option<cars::BoxedQuery<'a, diesel::pg::Pg>> {
    let (column, ascending) = match raw.rsplit_once('_') {
        Some((column, "asc")) => (column, true),
        Some((column, "desc")) => (column, false),
        _ => (raw, true),
    };

    let ordered = match (column, ascending) {
        ("plate", true) => query.order(cars::plate.asc()),
        ("plate", false) => query.order(cars::plate.desc()),
        ("brand", true) => query.order(cars::brand.asc()),
        ("brand", false) => query.order(cars::brand.desc()),
        ("model", true) => query.order(cars::model.asc()),
        ("model", false) => query.order(cars::model.desc()),
        ("km", true) => query.order(cars::km.asc()),
        ("km", false) => query.order(cars::km.desc()),
        ("year", true) => query.order(cars::year.asc()),
        ("year", false) => query.order(cars::year.desc()),
        ("price", true) => query.order(cars::price.asc()),
        ("price", false) => query.order(cars::price.desc()),
        ("status", true) => query.order(cars::status.asc()),
        ("status", false) => query.order(cars::status.desc()),
        ("createdAt", true) => query.order(cars::created_at.asc()),
        ("createdAt", false) => query.order(cars::created_at.desc()),
        _ => return None,
    };
    Some(ordered)
}
