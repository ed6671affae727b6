//! Field extraction for Turkish receipts (fiş).
//!
//! Every extractor works on the text the vision model returned and falls back
//! to `"N/A"` when the field is missing or fails validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{1,2})[-/.]([0-9]{1,2})[-/.]([0-9]{4})\b").unwrap());

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{2}):([0-9]{2})(?::[0-9]{2})?\b").unwrap());

static TOTAL_COST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:TOPLAM|TUTAR)\s*[:.]?\s*[*©#]?\s*([0-9]{1,3}(?:\.[0-9]{3})*(?:,[0-9]{1,2}))")
        .unwrap()
});

static VAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:TOPKDV|TOPLAM KDV|KDV(?:\s+\w+)?)\s*[:.]?\s*[*+\s]?#?\s*([0-9]{1,3}(?:\.[0-9]{3})*(?:,\s*[0-9]{1,2}))",
    )
    .unwrap()
});

static TAX_OFFICE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-ZÇĞİÖŞÜa-zçğıöşü\s.]+?)\s*(?:(?:VD|V\.?D\.?|VERGİ DAİRESİ|VN)\s*[:\-]?)")
        .unwrap()
});

static TAX_OFFICE_KEYWORD_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bVD\b",
        r"(?i)\bVERGİ DAİRESİ\b",
        r"(?i)\bVN\b",
        r"(?i)\bVKN\b",
        r"(?i)\bTCKN\b",
        r"(?i)\bV\.D\.",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static TAX_OFFICE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:V\.?D\.?|VD|VERGİ DAİRESİ|VN|VKN|TCKN)\s*[:\-]?\s*)?([0-9]{10,11})").unwrap()
});

static PRODUCT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-zÇĞİÖŞÜçğıöşü\s]+)\s+[0-9]+\s*\*").unwrap());

static PRODUCT_COST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\s*([0-9.,]+)").unwrap());

static INVOICE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)FİŞ NO[:\s]*([A-Za-z0-9\-]+)").unwrap());

/// Structured fields read from a receipt, printed by `--fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptFields {
    pub date: String,
    pub time: String,
    pub total_cost: String,
    pub vat: String,
    pub tax_office_name: String,
    pub tax_office_number: String,
    pub invoice_number: String,
    pub product_names: Vec<String>,
    pub product_costs: Vec<String>,
}

impl ReceiptFields {
    pub fn extract(text: &str) -> Self {
        Self {
            date: extract_date(text),
            time: extract_time(text),
            total_cost: extract_total_cost(text),
            vat: extract_vat(text),
            tax_office_name: extract_tax_office_name(text),
            tax_office_number: extract_tax_office_number(text),
            invoice_number: extract_invoice_number(text),
            product_names: extract_product_names(text),
            product_costs: extract_product_costs(text),
        }
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(month: u32, year: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// First `DD.MM.YYYY` (or `-`, `/` separated) date, as `DD/MM/YYYY`.
///
/// Only the first candidate is considered; an impossible date yields `N/A`.
pub fn extract_date(text: &str) -> String {
    let Some(caps) = DATE_RE.captures(text) else {
        return not_available();
    };
    let (Ok(day), Ok(month), Ok(year)) = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<u32>(),
    ) else {
        return not_available();
    };

    if !(1..=12).contains(&month) || !(1900..=2100).contains(&year) {
        return not_available();
    }
    if day < 1 || day > days_in_month(month, year) {
        return not_available();
    }

    format!("{day:02}/{month:02}/{year}")
}

/// First `HH:MM` or `HH:MM:SS`, as `HH:MM`.
pub fn extract_time(text: &str) -> String {
    let Some(caps) = TIME_RE.captures(text) else {
        return not_available();
    };
    let (Ok(hour), Ok(minute)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return not_available();
    };

    if hour < 24 && minute < 60 {
        format!("{hour:02}:{minute:02}")
    } else {
        not_available()
    }
}

/// Amount after `TOPLAM`/`TUTAR`, decimal comma replaced by a dot.
pub fn extract_total_cost(text: &str) -> String {
    TOTAL_COST_RE
        .captures(text)
        .map(|caps| caps[1].replace(',', "."))
        .unwrap_or_else(not_available)
}

/// Amount after `KDV`, `TOPKDV` or `TOPLAM KDV`.
pub fn extract_vat(text: &str) -> String {
    VAT_RE
        .captures(text)
        .map(|caps| caps[1].replace(',', ".").replace(' ', ""))
        .unwrap_or_else(not_available)
}

/// Last word before a `VD`/`V.D.`/`VERGİ DAİRESİ`/`VN` marker.
pub fn extract_tax_office_name(text: &str) -> String {
    TAX_OFFICE_NAME_RE
        .captures(text)
        .and_then(|caps| caps[1].split_whitespace().last().map(str::to_string))
        .unwrap_or_else(not_available)
}

/// 10-11 digit tax number (VKN/TCKN) on the first line carrying a tax marker.
pub fn extract_tax_office_number(text: &str) -> String {
    text.lines()
        .filter(|line| TAX_OFFICE_KEYWORD_RES.iter().any(|re| re.is_match(line)))
        .find_map(|line| TAX_OFFICE_NUMBER_RE.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(not_available)
}

/// Names of lines shaped like `EKMEK 1 *12,50`.
pub fn extract_product_names(text: &str) -> Vec<String> {
    PRODUCT_NAME_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Every amount prefixed with `*`.
pub fn extract_product_costs(text: &str) -> Vec<String> {
    PRODUCT_COST_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Value after `FİŞ NO`.
pub fn extract_invoice_number(text: &str) -> String {
    INVOICE_NUMBER_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(not_available)
}
