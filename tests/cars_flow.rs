mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::{json, Value};

async fn setup() -> Result<(TestApp, String)> {
    let app = TestApp::new().await?;
    app.insert_user("Car Tester", "car.tester@example.com", "password123", "USER")
        .await?;
    let token = app.login_token("car.tester@example.com", "password123").await?;
    Ok((app, token))
}

fn car_payload(plate: &str) -> Value {
    json!({
        "plate": plate,
        "brand": "Nissan",
        "model": "Sentra",
        "km": 75500,
        "year": 2018,
        "price": 50000.0,
        "status": "ACTIVED",
        "items": ["Airbag", "Ar-condicionado", "Rádio"]
    })
}

#[tokio::test]
async fn create_car_rejects_duplicate_plate() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("ABC1D23"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    assert!(body.get("id").is_some());
    assert_eq!(body["plate"], "ABC1D23");
    assert_eq!(body["items"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(body["items"][0]["name"], "Airbag");

    let response = app
        .post_json("/cars", &car_payload("ABC1D23"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(
        body["error"],
        "Já existe um carro com esta placa com status ativo ou inativo."
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn create_car_rejects_empty_required_fields() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json(
            "/cars",
            &json!({ "plate": "ABC1D23", "brand": "", "model": "Sentra" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "A marca não pode estar vazia.");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn plate_is_reusable_after_soft_delete() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("XYZ9A88"), Some(&token))
        .await?;
    let created = body_to_json(response.into_body()).await?;
    let car_id = created["id"].as_str().unwrap().to_string();

    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json("/cars", &car_payload("XYZ9A88"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn list_cars_filters_and_paginates() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    for (plate, brand, year, price) in [
        ("FLT0A01", "Nissan", 2018, 50000.0),
        ("FLT0A02", "Toyota", 2019, 55000.0),
        ("FLT0A03", "Honda", 2016, 48000.0),
    ] {
        let response = app
            .post_json(
                "/cars",
                &json!({
                    "plate": plate,
                    "brand": brand,
                    "model": "Sedan",
                    "km": 60000,
                    "year": year,
                    "price": price,
                    "status": "ACTIVED"
                }),
                Some(&token),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.get("/cars?minYear=2017&maxYear=2019", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["cars"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(body["total"], 2);

    let response = app
        .get("/cars?minPrice=48000&maxPrice=50000", Some(&token))
        .await?;
    let body = body_to_json(response.into_body()).await?;
    let cars = body["cars"].as_array().unwrap();
    assert!(cars
        .iter()
        .all(|car| car["price"].as_f64().unwrap() >= 48000.0
            && car["price"].as_f64().unwrap() <= 50000.0));

    let response = app.get("/cars?orderBy=brand_desc", Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    let brands: Vec<&str> = body["cars"]
        .as_array()
        .unwrap()
        .iter()
        .map(|car| car["brand"].as_str().unwrap())
        .collect();
    assert_eq!(brands, vec!["Toyota", "Nissan", "Honda"]);

    let response = app.get("/cars?page=1&pageSize=2", Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["cars"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 2);

    let response = app.get("/cars?orderBy=plate_sideways", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "Parâmetro orderBy inválido.");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn list_cars_reports_empty_result_as_not_found() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app.get("/cars?brand=NonExistingBrand", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["message"], "Nenhum carro encontrado.");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn get_car_by_id() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("GET1B11"), Some(&token))
        .await?;
    let created = body_to_json(response.into_body()).await?;
    let car_id = created["id"].as_str().unwrap().to_string();

    let response = app.get(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["id"].as_str(), Some(car_id.as_str()));

    let response = app
        .get(
            "/cars/00000000-0000-0000-0000-000000000000",
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "Carro não encontrado");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn update_car_replaces_items_in_input_order() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("UPD2C22"), Some(&token))
        .await?;
    let created = body_to_json(response.into_body()).await?;
    let car_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .put_json(
            &format!("/cars/{car_id}"),
            &json!({ "brand": "Nissan", "items": ["GPS", "Bancos de couro"] }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["brand"], "Nissan");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "GPS");
    assert_eq!(items[1]["name"], "Bancos de couro");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn update_rejects_deleted_car_and_invalid_status() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("DEL3D33"), Some(&token))
        .await?;
    let created = body_to_json(response.into_body()).await?;
    let car_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .put_json(
            &format!("/cars/{car_id}"),
            &json!({ "status": "INVALID" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"], "Status deve ser ACTIVED, INACTIVED ou DELETED.");

    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .put_json(
            &format!("/cars/{car_id}"),
            &json!({ "brand": "Toyota" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(
        body["error"],
        "Carros com status excluído não podem ser atualizados"
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn delete_car_lifecycle() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("RIP4E44"), Some(&token))
        .await?;
    let created = body_to_json(response.into_body()).await?;
    let car_id = created["id"].as_str().unwrap().to_string();

    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["message"], "Carro marcado como 'DELETED' com sucesso");

    // row kept, status flipped
    let response = app.get(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["status"], "DELETED");

    // re-deleting is an error, not a no-op
    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["message"], "Este carro já está excluído.");

    let response = app
        .delete("/cars/00000000-0000-0000-0000-000000000000", Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["message"], "Carro inexistente");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn delete_car_blocked_by_open_order() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let (app, token) = setup().await?;

    let response = app
        .post_json("/cars", &car_payload("OPN5F55"), Some(&token))
        .await?;
    let car = body_to_json(response.into_body()).await?;
    let car_id = car["id"].as_str().unwrap().to_string();

    let response = app
        .post_json(
            "/clients",
            &json!({
                "fullName": "Order Client",
                "email": "order.client@example.com",
                "cpf": "98765432100",
                "phone": "123456789",
                "birthDate": "1990-01-01"
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let client = body_to_json(response.into_body()).await?;
    let client_id = client["id"].as_str().unwrap().to_string();

    let response = app
        .post_json(
            "/orders",
            &json!({
                "carId": car_id,
                "clientId": client_id,
                "zipcode": "12345-678",
                "city": "Salvador",
                "state": "BA",
                "totalValue": 1000.0
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_to_json(response.into_body()).await?;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(
        body["message"],
        "Não é possível excluir o carro. Há pedidos em aberto."
    );

    // failed delete leaves the status untouched
    let response = app.get(&format!("/cars/{car_id}"), Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["status"], "ACTIVED");

    // canceling the order unblocks the delete
    let response = app.delete(&format!("/orders/{order_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.delete(&format!("/cars/{car_id}"), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}
