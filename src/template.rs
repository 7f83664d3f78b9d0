//! Invoice HTML assembly.
//!
//! Produces a fully self-contained A4 document: inline styles, a base64 PNG
//! QR code for the UPI payment URI, and pre-formatted Indian-locale money
//! strings. The headless browser receives this HTML verbatim.

use std::io::Cursor;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bigdecimal::{rounding::RoundingMode, BigDecimal, Zero};
use minijinja::{context, Environment};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use qrcode::QrCode;
use serde::Serialize;

use crate::billing::BillingStatement;
use crate::company::{BANK, COMPANY, TERMS_AND_CONDITIONS};
use crate::config::AppConfig;

const INVOICE_TEMPLATE: &str = include_str!("../templates/invoice.html");

const COLOR_BRAND: &str = "#1d4ed8";
const COLOR_SUCCESS: &str = "#16a34a";
const COLOR_DANGER: &str = "#dc2626";

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template("invoice.html", INVOICE_TEMPLATE)
            .expect("invoice template must parse");
        env
    })
}

/// `₹`-style number: two decimals, Indian digit grouping (12,34,567.50).
pub fn format_inr(value: &BigDecimal) -> String {
    let rounded = value.with_scale_round(2, RoundingMode::HalfUp);
    let raw = rounded.to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));
    format!("{sign}{}.{frac_part}", group_indian(int_part))
}

/// Weight column display: Indian grouping, up to two decimals, `-` for zero.
pub fn format_weight(value: &BigDecimal) -> String {
    if value <= &BigDecimal::zero() {
        return "-".to_string();
    }
    let rounded = value.with_scale_round(2, RoundingMode::HalfUp).normalized();
    let raw = rounded.to_string();
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
    let grouped = group_indian(int_part);
    if frac_part.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac_part}")
    }
}

fn group_indian(int_part: &str) -> String {
    if int_part.len() <= 3 {
        return int_part.to_string();
    }
    let (head, tail) = int_part.split_at(int_part.len() - 3);

    // After the last three digits, groups of two.
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Payment-request URI consumed by UPI apps, embedded in the QR code.
pub fn upi_uri(vpa: &str, payee_name: &str, amount_due: &BigDecimal, invoice_ref: &str) -> String {
    let amount = amount_due.with_scale_round(2, RoundingMode::HalfUp);
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}",
        encode_component(vpa),
        encode_component(payee_name),
        amount,
        encode_component(&format!("Invoice {invoice_ref}")),
    )
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

pub fn qr_data_uri(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes()).context("failed to encode QR payload")?;
    let rendered = code
        .render::<image::Luma<u8>>()
        .min_dimensions(280, 280)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(rendered)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("failed to encode QR image as PNG")?;

    Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
}

pub fn status_badge_color(status: &str) -> &'static str {
    if status.eq_ignore_ascii_case("paid") {
        COLOR_SUCCESS
    } else if status.eq_ignore_ascii_case("overdue") {
        COLOR_DANGER
    } else {
        COLOR_BRAND
    }
}

#[derive(Serialize)]
struct LineContext {
    index: usize,
    description: String,
    weight: String,
    amount: String,
}

#[derive(Serialize)]
struct InvoiceContext {
    invoice_ref: String,
    invoice_date: String,
    due_date: String,
    status: String,
    status_color: &'static str,
    customer_name: String,
    customer_city: String,
    customer_phone: String,
    lines: Vec<LineContext>,
    subtotal: String,
    previous_balance: String,
    amount_due: String,
    qr_data_uri: String,
}

pub fn render_invoice(statement: &BillingStatement, config: &AppConfig) -> Result<String> {
    let invoice = &statement.invoice;

    let uri = upi_uri(
        &config.upi_vpa,
        &config.upi_payee_name,
        &statement.amount_due,
        &invoice.invoice_ref,
    );
    let qr = qr_data_uri(&uri)?;

    let subtotal = if statement.items_subtotal > BigDecimal::zero() {
        statement.items_subtotal.clone()
    } else {
        invoice.amount.clone()
    };

    let lines = statement
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| LineContext {
            index: index + 1,
            description: line.description.clone(),
            weight: format_weight(&line.weight),
            amount: format_inr(&line.amount),
        })
        .collect();

    let ctx = InvoiceContext {
        invoice_ref: invoice.invoice_ref.clone(),
        invoice_date: invoice
            .invoice_date
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        due_date: invoice
            .due_date
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string()),
        status: invoice.status.to_uppercase(),
        status_color: status_badge_color(&invoice.status),
        customer_name: statement
            .customer
            .as_ref()
            .map(|customer| customer.name.clone())
            .unwrap_or_default(),
        customer_city: statement
            .customer
            .as_ref()
            .and_then(|customer| customer.city.clone())
            .unwrap_or_default(),
        customer_phone: statement
            .customer
            .as_ref()
            .and_then(|customer| customer.phone.clone())
            .unwrap_or_default(),
        lines,
        subtotal: format_inr(&subtotal),
        previous_balance: format_inr(&statement.previous_balance),
        amount_due: format_inr(&statement.amount_due),
        qr_data_uri: qr,
    };

    let html = environment()
        .get_template("invoice.html")
        .context("invoice template missing")?
        .render(context! {
            invoice => ctx,
            company => COMPANY,
            bank => BANK,
            terms => TERMS_AND_CONDITIONS,
        })
        .context("failed to render invoice template")?;

    Ok(html)
}
