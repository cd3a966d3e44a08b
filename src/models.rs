use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cpf: String,
    pub phone: String,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = cars)]
pub struct Car {
    pub id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub km: i32,
    pub year: i32,
    pub price: f64,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cars)]
pub struct NewCar {
    pub id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub km: i32,
    pub year: i32,
    pub price: f64,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = car_items)]
#[diesel(belongs_to(Car))]
pub struct CarItem {
    pub id: Uuid,
    pub car_id: Uuid,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = car_items)]
pub struct NewCarItem {
    pub id: Uuid,
    pub car_id: Uuid,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = orders)]
#[diesel(belongs_to(Car))]
#[diesel(belongs_to(Client))]
pub struct Order {
    pub id: Uuid,
    pub car_id: Uuid,
    pub client_id: Uuid,
    pub status: String,
    pub zipcode: String,
    pub city: String,
    pub state: String,
    pub total_value: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub car_id: Uuid,
    pub client_id: Uuid,
    pub status: String,
    pub zipcode: String,
    pub city: String,
    pub state: String,
    pub total_value: f64,
}
