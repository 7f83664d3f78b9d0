use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = shipments)]
#[diesel(belongs_to(Customer))]
pub struct Shipment {
    pub id: Uuid,
    pub shipment_ref: String,
    pub customer_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub service_type: String,
    pub weight: BigDecimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shipments)]
pub struct NewShipment {
    pub id: Uuid,
    pub shipment_ref: String,
    pub customer_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub service_type: String,
    pub weight: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = invoices)]
#[diesel(belongs_to(Customer))]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_ref: String,
    pub customer_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub pdf_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoices)]
pub struct NewInvoice {
    pub id: Uuid,
    pub invoice_ref: String,
    pub customer_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = invoice_items)]
#[diesel(belongs_to(Invoice))]
#[diesel(belongs_to(Shipment))]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoice_items)]
pub struct NewInvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = rates)]
pub struct Rate {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub service_type: String,
    pub rate_per_kg: BigDecimal,
    pub base_fee: BigDecimal,
    pub min_weight: BigDecimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = rates)]
pub struct NewRate {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub service_type: String,
    pub rate_per_kg: BigDecimal,
    pub base_fee: BigDecimal,
    pub min_weight: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = invoice_generation_logs)]
#[diesel(belongs_to(Invoice))]
pub struct GenerationLog {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoice_generation_logs)]
pub struct NewGenerationLog {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub started_at: NaiveDateTime,
}
