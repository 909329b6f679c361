use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use std::process::Command;
use std::str::FromStr;
use tempfile::NamedTempFile;
use uuid::Uuid;

fn config_json(organizer: Uuid, event: Uuid) -> String {
    format!(
        r#"{{
          "service_fee_rate": "0",
          "organizers": [{{"id": "{organizer}", "name": "Org", "commission_rate": "8"}}],
          "events": [{{
            "id": "{event}",
            "organizer_id": "{organizer}",
            "title": "Launch Night",
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
            "qr_secret": "cli-secret"
          }}]
        }}"#
    )
}

/// Parses the report row for `organizer` and compares every column as a
/// number, so decimal formatting never matters.
fn report_row(organizer: &'static str, expected: [Decimal; 5]) -> impl Fn(&str) -> bool {
    move |out: &str| {
        out.lines()
            .find(|l| l.starts_with(&format!("{organizer},")))
            .map(|line| {
                let cells: Vec<&str> = line.split(',').collect();
                cells.len() == 6
                    && cells[1..]
                        .iter()
                        .zip(expected.iter())
                        .all(|(cell, want)| Decimal::from_str(cell).ok() == Some(*want))
            })
            .unwrap_or(false)
    }
}

#[test]
fn test_replay_produces_settlement_report() {
    let organizer = Uuid::new_v4();
    let event = Uuid::new_v4();
    let user = Uuid::new_v4();

    let mut config = NamedTempFile::new().unwrap();
    config
        .write_all(config_json(organizer, event).as_bytes())
        .unwrap();

    let mut commands = NamedTempFile::new().unwrap();
    writeln!(commands, "type, user, event, ticket_type, quantity, method, reference, amount").unwrap();
    // Client-claimed price of 100 is ignored; the configured 1000 applies.
    writeln!(commands, "book, {user}, {event}, Regular, 2, , b1, 100").unwrap();
    writeln!(commands, "pay, , , , , card, b1, ").unwrap();
    writeln!(commands, "refund, {user}, , , , , b1, 500").unwrap();

    let mut cmd = Command::new(cargo_bin!("boxoffice"));
    cmd.arg(config.path()).arg(commands.path());

    // 2000 gross, 500 refunded, 8% commission net of the refunded share,
    // 2.9% card fee, organizer nets 1322.
    cmd.assert().success().stdout(
        predicate::function(report_row(
            "Org",
            [dec!(2000), dec!(500), dec!(120), dec!(58), dec!(1322)],
        ))
        .from_utf8(),
    );
}

#[test]
fn test_rejected_rows_go_to_stderr_and_do_not_abort() {
    let organizer = Uuid::new_v4();
    let event = Uuid::new_v4();
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    let mut config = NamedTempFile::new().unwrap();
    config
        .write_all(config_json(organizer, event).as_bytes())
        .unwrap();

    let mut commands = NamedTempFile::new().unwrap();
    writeln!(commands, "type, user, event, ticket_type, quantity, method, reference, amount").unwrap();
    writeln!(commands, "book, {other}, {event}, Regular, 9, , bad, ").unwrap();
    writeln!(commands, "pay, , , , , card, missing, ").unwrap();
    writeln!(commands, "book, {user}, {event}, Regular, 1, , b1, ").unwrap();
    writeln!(commands, "pay, , , , , mobile_money, b1, ").unwrap();

    let mut cmd = Command::new(cargo_bin!("boxoffice"));
    cmd.arg(config.path()).arg(commands.path());

    // 1000 gross, 8% commission, 1.5% mobile money fee.
    cmd.assert()
        .success()
        .stdout(
            predicate::function(report_row(
                "Org",
                [dec!(1000), dec!(0), dec!(80), dec!(15), dec!(905)],
            ))
            .from_utf8(),
        )
        .stderr(predicate::str::contains("Error processing command"));
}

#[test]
fn test_missing_config_fails() {
    let mut cmd = Command::new(cargo_bin!("boxoffice"));
    cmd.arg("does-not-exist.json").arg("nor-this.csv");
    cmd.assert().failure();
}
