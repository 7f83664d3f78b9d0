//! Static company, bank, and payment details printed on every invoice.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub name: &'static str,
    pub gstin: &'static str,
    pub state_line: &'static str,
    pub address_lines: &'static [&'static str],
    pub phone_primary: &'static str,
    pub phone_secondary: &'static str,
    pub email: &'static str,
}

pub const COMPANY: CompanyProfile = CompanyProfile {
    name: "NORTHEAST CARGO EXPRESS",
    gstin: "07AABCN9603R1ZX",
    state_line: "State: 07-Delhi",
    address_lines: &[
        "12/4 TRANSPORT NAGAR, KIRTI NAGAR",
        "BRANCH OFFICE: AIRPORT ROAD, NEAR CARGO COMPLEX",
        "IMPHAL WEST 795001",
    ],
    phone_primary: "9612345870",
    phone_secondary: "9819034521",
    email: "billing@necargoexpress.in",
};

#[derive(Debug, Clone, Serialize)]
pub struct BankDetails {
    pub bank_name: &'static str,
    pub branch: &'static str,
    pub account_name: &'static str,
    pub account_number: &'static str,
    pub ifsc: &'static str,
}

pub const BANK: BankDetails = BankDetails {
    bank_name: "HDFC BANK, NEW DELHI - KIRTI NAGAR",
    branch: "KIRTI NAGAR",
    account_name: "NORTHEAST CARGO EXPRESS",
    account_number: "50100298134476",
    ifsc: "HDFC0000419",
};

pub const TERMS_AND_CONDITIONS: &[&str] = &[
    "The consignor must declare the contents, value and condition of the items before booking.",
    "Fragile items travel at owner's risk unless booked under special arrangement.",
    "The company is not responsible for leakage or damage to perishable goods.",
    "Consignments found damaged, lost or misdelivered are compensated by weight with regard to the declared value of goods.",
    "Consignments not collected within 30 days may be treated as unclaimed and disposed of per company norms.",
];
