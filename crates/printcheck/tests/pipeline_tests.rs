//! Whole cases: mocked Drive API, scripted browser, real PDF parsing.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use printcheck::{Fixture, PermissionFlag, PrintCheckError, Retriever, SuiteRunner, UiLabels};

use common::{fast_timeouts, session, FakeDrive, FakeFile, MockDrive, PdfBuilder, PASSWORD};

const ALL_BUT_PRINT: &[PermissionFlag] = &[
    PermissionFlag::ModifyContents,
    PermissionFlag::Copy,
    PermissionFlag::ModifyAnnotations,
    PermissionFlag::FillInteractiveForms,
    PermissionFlag::CopyForAccessibility,
    PermissionFlag::Assemble,
];

struct World {
    dir: TempDir,
    drive: MockDrive,
    browser: FakeDrive,
}

impl World {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let drive = MockDrive::start().await;
        let browser = FakeDrive::new(
            UiLabels::default(),
            &drive.folder_url(),
            &dir.path().join("staging"),
        );
        Self {
            dir,
            drive,
            browser,
        }
    }

    fn fixtures_dir(&self) -> PathBuf {
        let path = self.dir.path().join("fixtures");
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes the PDF locally and makes the fake provider serve it under
    /// the same name, as if the upload had gone through.
    fn publish(&self, name: &str, builder: PdfBuilder, password: Option<&str>) -> PathBuf {
        let path = builder.write_to(&self.fixtures_dir(), name);
        let bytes = std::fs::read(&path).unwrap();
        let file = match password {
            Some(password) => FakeFile::protected(bytes, password),
            None => FakeFile::new(bytes),
        };
        self.browser.add_file(name, file);
        path
    }

    fn runner(&self, case_timeout: Duration) -> SuiteRunner<FakeDrive> {
        let retriever = Retriever::new(
            UiLabels::default(),
            fast_timeouts(),
            self.dir.path().join("downloads"),
        );
        SuiteRunner::new(
            session(),
            self.drive.distributor(),
            self.browser.clone(),
            retriever,
            case_timeout,
        )
    }
}

#[tokio::test]
async fn test_suite_scenarios_and_teardown() {
    let mut world = World::new().await;

    let locked = world.publish(
        "no_print_permission.pdf",
        PdfBuilder::new().encrypted(PASSWORD, "owner-secret", ALL_BUT_PRINT),
        Some(PASSWORD),
    );
    let open = world.publish("printable.pdf", PdfBuilder::new(), None);
    let printable_locked = world.publish(
        "printable_with_password.pdf",
        PdfBuilder::new().encrypted(PASSWORD, "owner-secret", &[PermissionFlag::Print]),
        Some(PASSWORD),
    );

    for (name, id) in [
        ("no_print_permission.pdf", "id-1"),
        ("printable.pdf", "id-2"),
        ("printable_with_password.pdf", "id-3"),
    ] {
        world.drive.expect_upload(name, id).await;
        world.drive.expect_share(id).await;
    }
    let listing = world
        .drive
        .expect_first_page(
            &[
                ("id-1", "no_print_permission.pdf"),
                ("id-2", "printable.pdf"),
                ("id-3", "printable_with_password.pdf"),
            ],
            None,
        )
        .await;
    for id in ["id-1", "id-2", "id-3"] {
        world.drive.expect_delete(id, 204).await;
    }
    let verification = world.drive.expect_first_page(&[], None).await;

    let fixtures = vec![
        Fixture::new(locked, false).with_password(PASSWORD),
        Fixture::new(open, true),
        Fixture::new(printable_locked, true).with_password(PASSWORD),
    ];
    let report = world
        .runner(Duration::from_secs(10))
        .run_suite(&fixtures)
        .await;

    assert!(report.passed(), "failures: {:?}", report.failures());

    let locked = report.case("no_print_permission.pdf").unwrap();
    let outcome = locked.result.as_ref().unwrap();
    assert!(!outcome.printable);
    assert!(!outcome.permissions.contains(PermissionFlag::Print));

    let open = report.case("printable.pdf").unwrap().result.as_ref().unwrap();
    assert!(open.permissions.is_unrestricted());
    assert!(open.printable);

    let printable = report
        .case("printable_with_password.pdf")
        .unwrap()
        .result
        .as_ref()
        .unwrap();
    assert!(printable.permissions.contains(PermissionFlag::Print));
    assert!(printable.printable);

    assert_eq!(report.cleanup.as_ref().unwrap().deleted, 3);
    assert_eq!(*report.remaining.as_ref().unwrap(), 0);
    assert_eq!(world.browser.opened_contexts(), 3);
    assert_eq!(world.browser.closed_contexts(), 3);
    listing.assert_async().await;
    verification.assert_async().await;
}

#[tokio::test]
async fn test_failing_case_does_not_block_others_or_teardown() {
    let mut world = World::new().await;
    let open = world.publish("printable.pdf", PdfBuilder::new(), None);
    // Uploaded but never shown by the provider.
    let hidden = PdfBuilder::new().write_to(&world.fixtures_dir(), "hidden.pdf");

    world.drive.expect_upload("printable.pdf", "id-1").await;
    world.drive.expect_share("id-1").await;
    world.drive.expect_upload("hidden.pdf", "id-2").await;
    world.drive.expect_share("id-2").await;
    world
        .drive
        .expect_first_page(&[("id-1", "printable.pdf"), ("id-2", "hidden.pdf")], None)
        .await;
    world.drive.expect_delete("id-1", 204).await;
    world.drive.expect_delete("id-2", 204).await;
    world.drive.expect_first_page(&[], None).await;

    let fixtures = vec![Fixture::new(open, true), Fixture::new(hidden, true)];
    let report = world
        .runner(Duration::from_secs(10))
        .run_suite(&fixtures)
        .await;

    assert!(!report.passed());
    assert!(report.case("printable.pdf").unwrap().passed());
    assert!(matches!(
        report.case("hidden.pdf").unwrap().result,
        Err(PrintCheckError::Retrieval(_))
    ));
    assert_eq!(report.cleanup.as_ref().unwrap().deleted, 2);
    assert_eq!(report.failures().len(), 1);
    // The context of the failed case is closed too.
    assert_eq!(world.browser.closed_contexts(), 2);
}

#[tokio::test]
async fn test_verdict_mismatch_fails_the_case() {
    let mut world = World::new().await;
    let locked = world.publish(
        "no_print_permission.pdf",
        PdfBuilder::new().encrypted(PASSWORD, "owner-secret", ALL_BUT_PRINT),
        Some(PASSWORD),
    );
    world
        .drive
        .expect_upload("no_print_permission.pdf", "id-1")
        .await;
    world.drive.expect_share("id-1").await;

    let fixture = Fixture::new(locked, true).with_password(PASSWORD);
    let outcome = world
        .runner(Duration::from_secs(10))
        .run_case(&fixture)
        .await
        .unwrap();

    assert!(!outcome.printable);
    assert!(!outcome.passed());
}

#[tokio::test]
async fn test_case_time_limit() {
    let mut world = World::new().await;
    // Never listed, so locating it waits out the whole locate timeout.
    let hidden = PdfBuilder::new().write_to(&world.fixtures_dir(), "hidden.pdf");
    world.drive.expect_upload("hidden.pdf", "id-1").await;
    world.drive.expect_share("id-1").await;

    let fixture = Fixture::new(hidden, true);
    let err = world
        .runner(Duration::from_millis(50))
        .run_case(&fixture)
        .await
        .unwrap_err();

    match err {
        PrintCheckError::CaseTimeout { case, limit } => {
            assert_eq!(case, "hidden.pdf");
            assert_eq!(limit, Duration::from_millis(50));
        }
        other => panic!("expected CaseTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_case_time_limit_closes_browser_context() {
    let mut world = World::new().await;
    let hidden = PdfBuilder::new().write_to(&world.fixtures_dir(), "hidden.pdf");
    world.drive.expect_upload("hidden.pdf", "id-1").await;
    world.drive.expect_share("id-1").await;

    let fixture = Fixture::new(hidden, true);
    let err = world
        .runner(Duration::from_millis(50))
        .run_case(&fixture)
        .await
        .unwrap_err();

    assert!(matches!(err, PrintCheckError::CaseTimeout { .. }));
    assert_eq!(world.browser.opened_contexts(), 1);
    assert_eq!(world.browser.opened_contexts(), world.browser.closed_contexts());
}

#[tokio::test]
async fn test_upload_failure_fails_the_case() {
    let world = World::new().await;
    let fixture = Fixture::new(world.fixtures_dir().join("absent.pdf"), true);

    let err = world
        .runner(Duration::from_secs(10))
        .run_case(&fixture)
        .await
        .unwrap_err();

    assert!(matches!(err, PrintCheckError::Upload(_)));
    assert_eq!(world.browser.opened_contexts(), 0);
}
