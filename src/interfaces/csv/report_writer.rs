use crate::application::settlement::RevenueSummary;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct SettlementRow {
    pub organizer: String,
    pub gross: Decimal,
    pub refunds: Decimal,
    pub commission: Decimal,
    pub gateway_fees: Decimal,
    pub net: Decimal,
}

impl SettlementRow {
    pub fn from_summary(organizer: &str, summary: &RevenueSummary) -> Self {
        Self {
            organizer: organizer.to_string(),
            gross: summary.gross_revenue,
            refunds: summary.total_refunds,
            commission: summary.total_commission,
            gateway_fees: summary.total_gateway_fees,
            net: summary.net_revenue,
        }
    }
}

/// Writes the per-organizer settlement report as CSV.
pub struct SettlementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SettlementWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_report(&mut self, rows: Vec<SettlementRow>) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
