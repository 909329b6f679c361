use crate::domain::event::{EventConfig, OrganizerConfig};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Marketplace snapshot consumed by the CLI: the event/organizer
/// configuration the out-of-scope CRUD layer would otherwise serve.
#[derive(Debug, Deserialize)]
pub struct MarketplaceConfig {
    /// Buyer-side service fee, percent of the booking subtotal.
    #[serde(default)]
    pub service_fee_rate: Decimal,
    pub organizers: Vec<OrganizerConfig>,
    pub events: Vec<EventConfig>,
}

pub fn load(path: &Path) -> Result<MarketplaceConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_minimal_config() {
        let organizer = uuid::Uuid::new_v4();
        let event = uuid::Uuid::new_v4();
        let json = format!(
            r#"{{
              "service_fee_rate": "2.5",
              "organizers": [{{"id": "{organizer}", "name": "Org", "commission_rate": "8"}}],
              "events": [{{
                "id": "{event}",
                "organizer_id": "{organizer}",
                "title": "Launch",
                "status": "published",
                "event_date": "2031-06-01T18:00:00Z",
                "end_date": null,
                "capacity": 100,
                "currency": "USD",
                "ticket_types": [{{
                  "name": "Regular",
                  "price": "1000",
                  "quantity": 50,
                  "max_per_order": 4,
                  "sale_start": null,
                  "sale_end": null,
                  "transferable": true
                }}],
                "platform_fee": null,
                "commission_rate": null,
                "commission_kind": null,
                "qr_secret": "s3cret"
              }}]
            }}"#
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.service_fee_rate, rust_decimal_macros::dec!(2.5));
        assert_eq!(config.organizers.len(), 1);
        assert_eq!(config.events[0].ticket_types[0].quantity, 50);
    }
}
