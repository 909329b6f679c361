mod common;

use boxoffice::domain::ticket::TicketStatus;
use boxoffice::error::Rejection;
use chrono::Utc;
use common::{book, fixture, pay};
use uuid::Uuid;

#[tokio::test]
async fn test_transfer_records_lineage() {
    let f = fixture().await;
    let owner = Uuid::new_v4();
    let recipient = Uuid::new_v4();
    let booking = book(&f, owner, "Regular", 1).await.unwrap();
    let (tickets, _) = pay(&f, &booking, "card").await;

    let transferred = f
        .marketplace
        .tickets
        .transfer(
            &tickets[0].code,
            recipient,
            Some("gift".into()),
            Utc::now(),
        )
        .await
        .unwrap();

    assert_eq!(transferred.status, TicketStatus::Transferred);
    assert_eq!(transferred.assigned_to, recipient);
    let lineage = transferred.transfer.unwrap();
    assert_eq!(lineage.transferred_from, owner);
    assert_eq!(lineage.transferred_to, recipient);
    assert_eq!(lineage.reason.as_deref(), Some("gift"));
}

#[tokio::test]
async fn test_transfer_rules() {
    let f = fixture().await;
    let owner = Uuid::new_v4();
    let booking = book(&f, owner, "Regular", 1).await.unwrap();
    let (tickets, _) = pay(&f, &booking, "card").await;

    // Not to yourself.
    let err = f
        .marketplace
        .tickets
        .transfer(&tickets[0].code, owner, None, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.rejections().unwrap(), &[Rejection::TransferToSelf]);

    // VIP is configured non-transferable.
    let vip_owner = Uuid::new_v4();
    let vip_booking = book(&f, vip_owner, "VIP", 1).await.unwrap();
    let (vip_tickets, _) = pay(&f, &vip_booking, "card").await;
    let err = f
        .marketplace
        .tickets
        .transfer(&vip_tickets[0].code, Uuid::new_v4(), None, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.rejections().unwrap(), &[Rejection::NotTransferable]);

    // Single hop only: a transferred ticket does not move again.
    f.marketplace
        .tickets
        .transfer(&tickets[0].code, Uuid::new_v4(), None, Utc::now())
        .await
        .unwrap();
    let err = f
        .marketplace
        .tickets
        .transfer(&tickets[0].code, Uuid::new_v4(), None, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err.rejections().unwrap(),
        &[Rejection::TicketNotUsable { status: "transferred".into() }]
    );
}

#[tokio::test]
async fn test_scan_marks_ticket_used_once() {
    let f = fixture().await;
    let booking = book(&f, Uuid::new_v4(), "Regular", 1).await.unwrap();
    let (tickets, _) = pay(&f, &booking, "card").await;

    let used = f
        .marketplace
        .tickets
        .use_ticket(&tickets[0].code, "scanner-1", Some("north-gate".into()), Utc::now())
        .await
        .unwrap();
    assert_eq!(used.status, TicketStatus::Used);
    let usage = used.usage.unwrap();
    assert_eq!(usage.used_by, "scanner-1");
    assert_eq!(usage.entry_gate.as_deref(), Some("north-gate"));

    let err = f
        .marketplace
        .tickets
        .use_ticket(&tickets[0].code, "scanner-2", None, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err.rejections().unwrap(),
        &[Rejection::TicketNotUsable { status: "used".into() }]
    );
}
