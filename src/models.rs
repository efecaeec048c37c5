use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::queue::Dispatcher;
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
}

/// Structured invoice data extracted by the analyzer.
///
/// Wire names follow the Turkish e-invoice schema the frontend and the
/// extraction prompt agree on, so the analyzer's JSON output deserializes
/// into this struct directly. Missing fields fall back to their zero
/// values rather than failing the parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceRecord {
    #[serde(rename = "fatura_no")]
    pub invoice_number: String,
    /// ISO-8601 date (YYYY-MM-DD) as printed on the document.
    #[serde(rename = "fatura_tarihi")]
    pub invoice_date: String,
    /// Stamped by the worker after a successful analysis; the analyzer is
    /// instructed to leave it empty.
    pub created_at: String,
    #[serde(rename = "satici_unvan")]
    pub seller_name: String,
    #[serde(rename = "satici_vkn")]
    pub seller_tax_id: String,
    #[serde(rename = "satici_adres")]
    pub seller_address: String,
    #[serde(rename = "kalemler")]
    pub line_items: Vec<InvoiceItem>,
    /// Subtotal excluding VAT.
    #[serde(rename = "ara_toplam")]
    pub net_total: f64,
    #[serde(rename = "kdv_tutari")]
    pub vat_total: f64,
    /// Grand total including VAT.
    #[serde(rename = "genel_toplam")]
    pub gross_total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceItem {
    #[serde(rename = "aciklama")]
    pub description: String,
    #[serde(rename = "miktar")]
    pub quantity: f64,
    /// Unit price excluding VAT.
    #[serde(rename = "birim_fiyat")]
    pub unit_price: f64,
    /// VAT rate as a fraction (0.18 for 18%).
    #[serde(rename = "kdv_orani")]
    pub vat_rate: f64,
    /// Line total including VAT.
    #[serde(rename = "tutar")]
    pub total: f64,
}

/// An uploaded document on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub data: Bytes,
    pub content_type: String,
    pub filename: String,
}

impl UploadPayload {
    pub fn new(data: Bytes, content_type: String, filename: String) -> Self {
        Self {
            data,
            content_type,
            filename,
        }
    }

    /// An empty body counts as a missing payload and never reaches the
    /// external collaborators.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What a worker hands back for a successful job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub invoice: InvoiceRecord,
    /// Set when archival failed but the configured policy keeps the
    /// extraction anyway.
    pub archive_warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Serialize)]
pub struct PresignedUrlResponse {
    pub url: String,
}
