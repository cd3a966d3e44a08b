use std::cmp::Ordering;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::exists;
use diesel::{prelude::*, result::DatabaseErrorKind, select};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Client, NewClient};
use crate::schema::clients;
use crate::state::AppState;
use crate::validation::{is_valid_cpf, is_valid_email};

use super::to_iso;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClientRequest {
    full_name: String,
    email: String,
    cpf: String,
    phone: String,
    birth_date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = clients)]
struct UpdateClientChangeset<'a> {
    full_name: Option<&'a str>,
    email: Option<&'a str>,
    cpf: Option<&'a str>,
    phone: Option<&'a str>,
    birth_date: Option<NaiveDate>,
}

#[derive(Clone, Copy)]
enum ClientSortKey {
    FullName,
    Email,
    Cpf,
    BirthDate,
    CreatedAt,
    /// Soft-deleted rows first, then full name.
    Excluido,
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<ClientResponse>)> {
    let empty_body = payload.as_object().map(|obj| obj.is_empty()).unwrap_or(true);
    if empty_body {
        return Err(AppError::bad_request(
            "Corpo da requisição não está definido.",
        ));
    }
    let request: CreateClientRequest = serde_json::from_value(payload)
        .map_err(|_| AppError::bad_request("Corpo da requisição não está definido."))?;

    if !is_valid_email(&request.email) {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Invalid email format",
        ));
    }
    if !is_valid_cpf(&request.cpf) {
        return Err(AppError::message(
            StatusCode::NOT_FOUND,
            "Invalid cpf format",
        ));
    }
    let birth_date = parse_birth_date(&request.birth_date)
        .ok_or_else(|| AppError::bad_request("Data de nascimento inválida."))?;

    let mut conn = state.db()?;

    // uniqueness is global here: a soft-deleted client still blocks reuse
    let duplicate: bool = select(exists(
        clients::table.filter(
            clients::cpf
                .eq(&request.cpf)
                .or(clients::email.eq(&request.email)),
        ),
    ))
    .get_result(&mut conn)?;
    if duplicate {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Client already exist",
        ));
    }

    let new_client = NewClient {
        id: Uuid::new_v4(),
        full_name: request.full_name,
        email: request.email,
        cpf: request.cpf,
        phone: request.phone,
        birth_date,
    };

    match diesel::insert_into(clients::table)
        .values(&new_client)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::message(
                StatusCode::BAD_REQUEST,
                "Client already exist",
            ));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let client: Client = clients::table.find(new_client.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(build_response(client))))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Vec<ClientResponse>>> {
    let mut nome: Option<String> = None;
    let mut sort_keys: Vec<ClientSortKey> = Vec::new();
    for (key, value) in &params {
        match key.as_str() {
            "nome" => nome = Some(value.clone()),
            "orderBy" => sort_keys.push(
                parse_sort_key(value)
                    .ok_or_else(|| AppError::bad_request("Parâmetro orderBy inválido."))?,
            ),
            _ => {}
        }
    }

    let mut conn = state.db()?;

    let mut query = clients::table.into_boxed();
    if let Some(nome) = nome.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(clients::full_name.ilike(format!("%{nome}%")));
    }

    let mut rows: Vec<Client> = query.order(clients::created_at.asc()).load(&mut conn)?;

    // sort_by is stable, so ties keep their incoming order
    if !sort_keys.is_empty() {
        rows.sort_by(|a, b| {
            for key in &sort_keys {
                let ordering = compare_clients(*key, a, b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    Ok(Json(rows.into_iter().map(build_response).collect()))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;

    let client: Client = clients::table
        .find(client_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Client Not Found"))?;

    Ok(Json(build_response(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;

    let existing: Client = clients::table
        .find(client_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::message(StatusCode::BAD_REQUEST, "Client not found"))?;

    if let Some(ref email) = payload.email {
        if !is_valid_email(email) {
            return Err(AppError::message(
                StatusCode::BAD_REQUEST,
                "Invalid email format",
            ));
        }
        if email != &existing.email {
            let duplicate: bool = select(exists(
                clients::table
                    .filter(clients::email.eq(email))
                    .filter(clients::id.ne(client_id)),
            ))
            .get_result(&mut conn)?;
            if duplicate {
                return Err(AppError::message(
                    StatusCode::BAD_REQUEST,
                    "Client already exist",
                ));
            }
        }
    }

    if let Some(ref cpf) = payload.cpf {
        if !is_valid_cpf(cpf) {
            return Err(AppError::message(
                StatusCode::NOT_FOUND,
                "Invalid cpf format",
            ));
        }
        if cpf != &existing.cpf {
            let duplicate: bool = select(exists(
                clients::table
                    .filter(clients::cpf.eq(cpf))
                    .filter(clients::id.ne(client_id)),
            ))
            .get_result(&mut conn)?;
            if duplicate {
                return Err(AppError::message(
                    StatusCode::BAD_REQUEST,
                    "Client already exist",
                ));
            }
        }
    }

    let birth_date = match payload.birth_date.as_deref() {
        Some(raw) => Some(
            parse_birth_date(raw)
                .ok_or_else(|| AppError::bad_request("Data de nascimento inválida."))?,
        ),
        None => None,
    };

    let changeset = UpdateClientChangeset {
        full_name: payload.full_name.as_deref(),
        email: payload.email.as_deref(),
        cpf: payload.cpf.as_deref(),
        phone: payload.phone.as_deref(),
        birth_date,
    };

    let now = Utc::now().naive_utc();
    diesel::update(clients::table.find(client_id))
        .set((&changeset, clients::updated_at.eq(now)))
        .execute(&mut conn)
        .map_err(|err| AppError::internal("An unexpected error occurred.", err))?;

    let client: Client = clients::table.find(client_id).first(&mut conn)?;
    Ok(Json(build_response(client)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<ClientResponse>> {
    let mut conn = state.db()?;

    let existing: Option<Client> = clients::table.find(client_id).first(&mut conn).optional()?;
    let existing = match existing {
        Some(client) if client.deleted_at.is_none() => client,
        _ => return Err(AppError::not_found("Client Not Found")),
    };

    let now = Utc::now().naive_utc();
    diesel::update(clients::table.find(existing.id))
        .set((
            clients::deleted_at.eq(Some(now)),
            clients::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let client: Client = clients::table.find(client_id).first(&mut conn)?;
    Ok(Json(build_response(client)))
}

fn parse_sort_key(raw: &str) -> Option<ClientSortKey> {
    match raw {
        "fullName" => Some(ClientSortKey::FullName),
        "email" => Some(ClientSortKey::Email),
        "cpf" => Some(ClientSortKey::Cpf),
        "birthDate" => Some(ClientSortKey::BirthDate),
        "createdAt" => Some(ClientSortKey::CreatedAt),
        "excluido" => Some(ClientSortKey::Excluido),
        _ => None,
    }
}

fn compare_clients(key: ClientSortKey, a: &Client, b: &Client) -> Ordering {
    match key {
        ClientSortKey::FullName => a.full_name.cmp(&b.full_name),
        ClientSortKey::Email => a.email.cmp(&b.email),
        ClientSortKey::Cpf => a.cpf.cmp(&b.cpf),
        ClientSortKey::BirthDate => a.birth_date.cmp(&b.birth_date),
        ClientSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        ClientSortKey::Excluido => b
            .deleted_at
            .is_some()
            .cmp(&a.deleted_at.is_some())
            .then_with(|| a.full_name.cmp(&b.full_name)),
    }
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn build_response(client: Client) -> ClientResponse {
    ClientResponse {
        id: client.id,
        full_name: client.full_name,
        email: client.email,
        cpf: client.cpf,
        phone: client.phone,
        birth_date: client.birth_date.format("%Y-%m-%d").to_string(),
        created_at: to_iso(client.created_at),
        updated_at: to_iso(client.updated_at),
        deleted_at: client.deleted_at.map(to_iso),
    }
}
