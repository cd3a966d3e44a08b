use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::password,
    error::{AppError, AppResult},
    models::User,
    schema::users,
    state::AppState,
    validation::is_valid_email,
};

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<LoginResponse>> {
    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let password_input = payload
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    if email.is_empty() || password_input.is_empty() {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Email e senha são obrigatórios.",
        ));
    }
    if !is_valid_email(&email) {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Invalid email format",
        ));
    }

    let mut conn = state.db()?;

    let user: Option<User> = users::table
        .filter(users::email.eq(&email))
        .first(&mut conn)
        .optional()?;
    let Some(user) = user else {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "User does not exist",
        ));
    };
    if user.deleted_at.is_some() {
        return Err(AppError::message(StatusCode::BAD_REQUEST, "User is deleted"));
    }

    let valid = password::verify_password(&password_input, &user.password_hash)
        .map_err(|err| AppError::internal("Erro interno.", err))?;
    if !valid {
        return Err(AppError::message(
            StatusCode::BAD_REQUEST,
            "Invalid password",
        ));
    }

    let token = state
        .jwt
        .generate_token(user.id, &user.email, &user.role)
        .map_err(AppError::from)?;

    Ok(Json(LoginResponse { token }))
}
