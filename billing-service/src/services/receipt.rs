//! Best-effort payment receipt rendering.
//!
//! Receipts are plain-text artifacts written after the payment transaction
//! commits. A rendering failure never unwinds the payment; callers surface
//! it as a warning. The output directory is served under `/receipts`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument};

use crate::models::{Customer, Entry, Payment};
use crate::utils::dates::{format_date_readable, format_datetime_readable};

/// Reference to a rendered receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptArtifact {
    pub filename: String,
    pub url: String,
}

/// Renders receipts into a configured directory.
#[derive(Debug, Clone)]
pub struct ReceiptWriter {
    dir: PathBuf,
}

impl ReceiptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Render and persist the receipt for a committed payment. The entries
    /// are the allocation snapshot with their updated paid amounts.
    #[instrument(skip(self, customer, entries, payment), fields(payment_id = %payment.payment_id))]
    pub async fn write_receipt(
        &self,
        customer: &Customer,
        entries: &[Entry],
        payment: &Payment,
    ) -> Result<ReceiptArtifact, AppError> {
        let filename = format!("bill_{}.txt", payment.payment_id);
        let path = self.dir.join(&filename);

        let body = render_receipt(customer, entries, payment);
        tokio::fs::write(&path, body).await?;

        info!(filename = %filename, "Receipt rendered");

        Ok(ReceiptArtifact {
            url: format!("/receipts/{}", filename),
            filename,
        })
    }
}

fn render_receipt(customer: &Customer, entries: &[Entry], payment: &Payment) -> String {
    let mut out = String::new();

    out.push_str("                 PAYMENT BILL\n");
    out.push_str("=============================================\n");
    out.push_str(&format!("Bill ID      : {}\n", payment.payment_id));
    out.push_str(&format!("Customer     : {} ({})\n", customer.name, customer.serial));
    out.push_str(&format!(
        "Phone        : {}\n",
        customer.phone.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "Period       : {} to {}\n",
        format_date_readable(payment.from_date),
        format_date_readable(payment.to_date)
    ));
    out.push_str(&format!(
        "Payment Mode : {}\n",
        payment.mode.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "Payment Date : {}\n",
        format_datetime_readable(&payment.payment_date)
    ));
    out.push_str("---------------------------------------------\n");
    out.push_str("Entries:\n");

    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} | Kgs: {} | Rate: {} | Comm: {} | Amount: {:.2} | Paid: {:.2}\n",
            i + 1,
            format_date_readable(entry.entry_date),
            entry.kgs,
            entry.rate,
            entry.commission,
            entry.computed_amount(),
            entry.paid_amount,
        ));
    }

    out.push_str("---------------------------------------------\n");
    out.push_str(&format!("Total Paid This Time : {:.2}\n", payment.amount));

    out
}
