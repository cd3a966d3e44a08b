use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::dsl::exists;
use diesel::{prelude::*, result::DatabaseErrorKind, select};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::state::AppState;
use crate::validation::{classify_field, is_valid_email, FieldValue};

use super::to_iso;

pub const USER_ROLES: &[&str] = &["USER", "ADMIN"];
const MIN_PASSWORD_LENGTH: usize = 6;

const EMPTY_NAME_MESSAGE: &str = "O nome não pode ser vazio.";
const NAME_TYPE_MESSAGE: &str = "O nome deve ser uma string.";
const INVALID_EMAIL_MESSAGE: &str = "O email deve ser válido.";
const SHORT_PASSWORD_MESSAGE: &str = "A senha deve ter pelo menos 6 caracteres.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedUserResponse {
    pub updated_user: UserResponse,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
struct UpdateUserChangeset {
    full_name: Option<String>,
    email: Option<String>,
    password_hash: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let mut errors = Vec::new();

    let full_name = match classify_field(payload.get("fullName")) {
        FieldValue::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        FieldValue::String(_) | FieldValue::Omitted | FieldValue::Null => {
            errors.push(EMPTY_NAME_MESSAGE.to_string());
            None
        }
        FieldValue::Other => {
            errors.push(NAME_TYPE_MESSAGE.to_string());
            None
        }
    };

    let email = match classify_field(payload.get("email")) {
        FieldValue::String(value) if is_valid_email(&value) => Some(value),
        _ => {
            errors.push(INVALID_EMAIL_MESSAGE.to_string());
            None
        }
    };

    let password = match classify_field(payload.get("password")) {
        FieldValue::String(value) if value.len() >= MIN_PASSWORD_LENGTH => Some(value),
        _ => {
            errors.push(SHORT_PASSWORD_MESSAGE.to_string());
            None
        }
    };

    let role = match classify_field(payload.get("role")) {
        FieldValue::Omitted => Some("USER".to_string()),
        FieldValue::String(value) if USER_ROLES.contains(&value.as_str()) => Some(value),
        _ => {
            errors.push("Role deve ser USER ou ADMIN.".to_string());
            None
        }
    };

    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }
    let (full_name, email, password, role) = (
        full_name.unwrap_or_default(),
        email.unwrap_or_default(),
        password.unwrap_or_default(),
        role.unwrap_or_default(),
    );

    let mut conn = state.db()?;

    let duplicate: bool = select(exists(
        users::table
            .filter(users::email.eq(&email))
            .filter(users::deleted_at.is_null()),
    ))
    .get_result(&mut conn)?;
    if duplicate {
        return Err(AppError::bad_request("E-mail já está em uso."));
    }

    let password_hash = hash_password(&password)?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        full_name,
        email,
        password_hash,
        role,
    };

    match diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request("E-mail já está em uso."));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let user: User = users::table.find(new_user.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(build_response(user))))
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<User> = users::table
        .filter(users::deleted_at.is_null())
        .order(users::created_at.asc())
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found("Usuários não encontrados."));
    }

    Ok(Json(rows.into_iter().map(build_response).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let mut conn = state.db()?;

    let user: User = users::table
        .find(user_id)
        .filter(users::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Usuário não encontrado"))?;

    Ok(Json(build_response(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> AppResult<Json<UpdatedUserResponse>> {
    let mut errors = Vec::new();

    let full_name = match classify_field(payload.get("fullName")) {
        FieldValue::Omitted => None,
        FieldValue::Null => {
            errors.push(EMPTY_NAME_MESSAGE.to_string());
            None
        }
        FieldValue::Other => {
            errors.push(NAME_TYPE_MESSAGE.to_string());
            None
        }
        FieldValue::String(value) => {
            if value.trim().is_empty() {
                errors.push(EMPTY_NAME_MESSAGE.to_string());
                None
            } else {
                Some(value.trim().to_string())
            }
        }
    };

    let email = match classify_field(payload.get("email")) {
        FieldValue::Omitted => None,
        FieldValue::String(value) if is_valid_email(&value) => Some(value),
        _ => {
            errors.push(INVALID_EMAIL_MESSAGE.to_string());
            None
        }
    };

    let password = match classify_field(payload.get("password")) {
        FieldValue::Omitted => None,
        FieldValue::String(value) if value.len() >= MIN_PASSWORD_LENGTH => Some(value),
        _ => {
            errors.push(SHORT_PASSWORD_MESSAGE.to_string());
            None
        }
    };

    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let mut conn = state.db()?;

    let existing: User = users::table
        .find(user_id)
        .filter(users::deleted_at.is_null())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Usuário não encontrado."))?;

    if let Some(ref email) = email {
        if email != &existing.email {
            let occupied: bool = select(exists(
                users::table
                    .filter(users::email.eq(email))
                    .filter(users::id.ne(user_id))
                    .filter(users::deleted_at.is_null()),
            ))
            .get_result(&mut conn)?;
            if occupied {
                return Err(AppError::bad_request("Email já está sendo utilizado"));
            }
        }
    }

    let password_hash = match password {
        Some(ref password) => Some(hash_password(password)?),
        None => None,
    };

    let changeset = UpdateUserChangeset {
        full_name,
        email,
        password_hash,
    };

    let now = Utc::now().naive_utc();
    diesel::update(users::table.find(user_id))
        .set((&changeset, users::updated_at.eq(now)))
        .execute(&mut conn)?;

    let user: User = users::table.find(user_id).first(&mut conn)?;
    Ok(Json(UpdatedUserResponse {
        updated_user: build_response(user),
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    let exists_row: bool = select(exists(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::deleted_at.is_null()),
    ))
    .get_result(&mut conn)?;
    if !exists_row {
        return Err(AppError::not_found("Usuário não encontrado"));
    }

    let now = Utc::now().naive_utc();
    diesel::update(users::table.find(user_id))
        .set((users::deleted_at.eq(Some(now)), users::updated_at.eq(now)))
        .execute(&mut conn)?;

    Ok(StatusCode::NO_CONTENT)
}

fn build_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
        created_at: to_iso(user.created_at),
        updated_at: to_iso(user.updated_at),
        deleted_at: user.deleted_at.map(to_iso),
    }
}
