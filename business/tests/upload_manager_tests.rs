//! End-to-end tests for the upload manager against a mock HTTP server.
//!
//! Each test stands up a `wiremock` server playing the admin upload
//! endpoint and observes the owner callback through a flume channel.

use std::time::Duration;

use flagdrop_business::{
    CandidateFile, Client, FileField, SettledFiles, SlotPhase, UploadManager, UploaderConfig,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOAD_PATH: &str = "/teams/upload/flagIcon";

fn config_for(server: &MockServer, max_slots: usize) -> UploaderConfig {
    UploaderConfig::new(
        max_slots,
        &format!("{}{UPLOAD_PATH}", server.uri()),
        "flagIcon",
        "http://cdn.example.com/tmp",
        "http://cdn.example.com/img",
    )
}

fn manager_with_callback(
    config: UploaderConfig,
) -> (UploadManager, flume::Receiver<SettledFiles>) {
    let (tx, rx) = flume::unbounded();
    let manager = UploadManager::new(config, Client::with_bearer("test-token"), move |settled| {
        tx.send(settled).ok();
    });
    (manager, rx)
}

fn png(name: &str) -> CandidateFile {
    CandidateFile {
        filename: name.to_owned(),
        mime_type: "image/png".to_owned(),
        bytes: format!("fake png bytes for {name}").into_bytes(),
    }
}

async fn recv_settled(rx: &flume::Receiver<SettledFiles>) -> SettledFiles {
    tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
        .await
        .expect("timed out waiting for settlement")
        .expect("callback channel closed")
}

fn success_body(filename: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "filename": filename } }))
}

#[tokio::test]
async fn single_file_drop_reports_scalar_filenames() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(success_body("stored-1.png"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 1));
    let rejections = manager.accept_drop(vec![png("flag.png")]);
    assert!(rejections.is_empty());

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single("stored-1.png".to_owned()));
    assert_eq!(settled.to_delete, FileField::Single(String::new()));

    let batch = manager.batch();
    let slot = batch.visible_slots().next().expect("one slot");
    assert_eq!(slot.phase(), SlotPhase::Committed);
    assert_eq!(slot.committed_name(), "stored-1.png");
}

#[tokio::test]
async fn multi_file_drop_keeps_drop_order_despite_arrival_order() {
    let server = MockServer::start().await;
    // First file answers slowly, second quickly: completion order is the
    // reverse of drop order.
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("one.png"))
        .respond_with(success_body("stored-one.png").set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("two.png"))
        .respond_with(success_body("stored-two.png").set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 3));
    manager.accept_drop(vec![png("one.png"), png("two.png")]);

    let settled = recv_settled(&rx).await;
    assert_eq!(
        settled.to_add,
        FileField::Many(vec!["stored-one.png".to_owned(), "stored-two.png".to_owned()])
    );
    assert_eq!(settled.to_delete, FileField::Many(Vec::new()));
    // Exactly one settlement for the whole drop.
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn server_rejection_surfaces_field_error_on_the_slot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "data": { "flagIcon": "Flag icon must be an image" } })),
        )
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 1));
    manager.accept_drop(vec![png("broken.png")]);

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single(String::new()));

    let batch = manager.batch();
    let slot = batch.visible_slots().next().expect("one slot");
    assert_eq!(slot.phase(), SlotPhase::Failed);
    assert_eq!(slot.error(), Some("Flag icon must be an image"));
    assert_eq!(slot.progress(), 100);
}

#[tokio::test]
async fn cancelling_in_flight_slot_excludes_it_from_both_lists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(success_body("never-used.png").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 1));
    manager.accept_drop(vec![png("slow.png")]);

    let id = manager.batch().live_slot_ids()[0];
    manager.remove_slot(id);

    // Settlement arrives without waiting out the 30s response.
    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single(String::new()));
    assert_eq!(settled.to_delete, FileField::Single(String::new()));

    let batch = manager.batch();
    let slot = batch.slot(id).expect("slot retained");
    assert!(slot.is_removed());
    assert!(slot.error().is_none(), "cancellation must not read as failure");
    assert_eq!(batch.visible_slots().count(), 0);
}

#[tokio::test]
async fn removing_a_slot_twice_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(success_body("x.png").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 1));
    manager.accept_drop(vec![png("a.png")]);

    let id = manager.batch().live_slot_ids()[0];
    manager.remove_slot(id);
    let first = recv_settled(&rx).await;
    assert_eq!(first.to_add, FileField::Single(String::new()));

    manager.remove_slot(id);
    assert!(rx.try_recv().is_err(), "second removal must not re-report");
}

#[tokio::test]
async fn untouched_pre_existing_batch_never_fires_the_callback() {
    let server = MockServer::start().await;
    let config = config_for(&server, 1).with_initial_files(["flag-a.png".to_owned()]);
    let (manager, rx) = manager_with_callback(config);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    let batch = manager.batch();
    let slot = batch.visible_slots().next().expect("seeded slot");
    assert_eq!(slot.phase(), SlotPhase::PreExisting);
    assert_eq!(
        slot.preview(),
        &flagdrop_business::PreviewSource::Remote {
            url: "http://cdn.example.com/img/flag-a.png".to_owned()
        }
    );
}

#[tokio::test]
async fn removing_pre_existing_file_reports_it_for_deletion() {
    let server = MockServer::start().await;
    let config = config_for(&server, 1).with_initial_files(["flag-a.png".to_owned()]);
    let (manager, rx) = manager_with_callback(config);

    let id = manager.batch().live_slot_ids()[0];
    manager.remove_slot(id);

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single(String::new()));
    assert_eq!(settled.to_delete, FileField::Single("flag-a.png".to_owned()));
}

#[tokio::test]
async fn single_file_redrop_replaces_the_pre_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(success_body("stored-new.png"))
        .mount(&server)
        .await;

    let config = config_for(&server, 1).with_initial_files(["flag-a.png".to_owned()]);
    let (manager, rx) = manager_with_callback(config);
    manager.accept_drop(vec![png("new.png")]);

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single("stored-new.png".to_owned()));
    assert_eq!(settled.to_delete, FileField::Single("flag-a.png".to_owned()));
    assert_eq!(manager.batch().visible_slots().count(), 1);
}

#[tokio::test]
async fn over_capacity_drop_is_rejected_wholesale() {
    let server = MockServer::start().await;
    let config = config_for(&server, 3).with_initial_files(["flag-a.png".to_owned()]);
    let (manager, rx) = manager_with_callback(config);

    // One pre-existing slot leaves room for two more; dropping three must
    // reject the whole batch and create no slots.
    let rejections = manager.accept_drop(vec![png("a.png"), png("b.png"), png("c.png")]);
    assert_eq!(rejections.len(), 3);
    assert!(rejections.iter().all(|m| m.ends_with("Too many files")));
    assert_eq!(manager.batch().live_count(), 1);
    assert_eq!(manager.rejection_notices().len(), 3);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn wrong_type_is_rejected_with_readable_message() {
    let server = MockServer::start().await;
    let (manager, rx) = manager_with_callback(config_for(&server, 1));

    let rejections = manager.accept_drop(vec![CandidateFile {
        filename: "doc.pdf".to_owned(),
        mime_type: "application/pdf".to_owned(),
        bytes: b"%PDF-1.4".to_vec(),
    }]);

    assert_eq!(
        rejections,
        vec![
            "doc.pdf: File type must be one of image/jpeg, image/png, image/tiff, image/gif"
                .to_owned()
        ]
    );
    assert_eq!(manager.batch().live_count(), 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn transport_failure_is_recorded_as_slot_error() {
    // Point the manager at a closed port: the request fails without a
    // server-side field error and must fall back to a generic message.
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let config = UploaderConfig::new(
        1,
        &format!("{uri}{UPLOAD_PATH}"),
        "flagIcon",
        "http://cdn.example.com/tmp",
        "http://cdn.example.com/img",
    );
    let (manager, rx) = manager_with_callback(config);
    manager.accept_drop(vec![png("flag.png")]);

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Single(String::new()));

    let batch = manager.batch();
    let slot = batch.visible_slots().next().expect("one slot");
    assert_eq!(slot.phase(), SlotPhase::Failed);
    assert!(slot.error().is_some());
}

#[tokio::test]
async fn one_failure_does_not_block_the_other_uploads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("good.png"))
        .respond_with(success_body("stored-good.png"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("bad.png"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "data": { "flagIcon": "Flag icon must be an image" } })),
        )
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 3));
    manager.accept_drop(vec![png("good.png"), png("bad.png")]);

    let settled = recv_settled(&rx).await;
    assert_eq!(settled.to_add, FileField::Many(vec!["stored-good.png".to_owned()]));

    let batch = manager.batch();
    let phases: Vec<_> = batch.visible_slots().map(|s| s.phase()).collect();
    assert_eq!(phases, vec![SlotPhase::Committed, SlotPhase::Failed]);
}

#[tokio::test]
async fn removal_after_settlement_re_reports_current_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("one.png"))
        .respond_with(success_body("stored-one.png"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(body_string_contains("two.png"))
        .respond_with(success_body("stored-two.png"))
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 3));
    manager.accept_drop(vec![png("one.png"), png("two.png")]);

    let first = recv_settled(&rx).await;
    assert_eq!(
        first.to_add,
        FileField::Many(vec!["stored-one.png".to_owned(), "stored-two.png".to_owned()])
    );

    // Removing a committed file re-settles with the reduced list.
    let remaining = manager
        .batch()
        .visible_slots()
        .find(|s| s.committed_name() == "stored-one.png")
        .expect("committed slot")
        .id();
    manager.remove_slot(remaining);

    let second = recv_settled(&rx).await;
    assert_eq!(second.to_add, FileField::Many(vec!["stored-two.png".to_owned()]));
}

#[tokio::test]
async fn committed_slot_preview_moves_to_temp_storage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(success_body("stored-1.png"))
        .mount(&server)
        .await;

    let (manager, rx) = manager_with_callback(config_for(&server, 3));
    manager.accept_drop(vec![png("flag.png")]);
    recv_settled(&rx).await;

    let batch = manager.batch();
    let slot = batch.visible_slots().next().expect("one slot");
    assert_eq!(
        slot.preview(),
        &flagdrop_business::PreviewSource::Remote {
            url: "http://cdn.example.com/tmp/stored-1.png".to_owned()
        }
    );
    assert!(slot.preview_bytes().is_none(), "local bytes released after commit");
}
