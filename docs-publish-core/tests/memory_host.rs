use docs_publish_core::contract::HostingError;
use docs_publish_core::memory::{HostOperation, HostOperationKind, MemoryHost};
use docs_publish_core::publish::{
    publish, PublishOutcome, PublishRequest, ORPHAN_COMMIT_MESSAGE, UPDATE_COMMIT_MESSAGE,
};

fn repository_with_main() -> MemoryHost {
    MemoryHost::new().with_branch(
        "main",
        &[
            ("README.md", b"# docs".as_slice()),
            ("src/lib.rs", b"pub fn docs() {}".as_slice()),
        ],
    )
}

fn gh_pages_request(content: &[u8], orphan: bool) -> PublishRequest {
    PublishRequest::new("acme", "docs", "gh-pages", "index.html", content.to_vec(), orphan)
        .expect("valid request")
}

#[tokio::test]
async fn new_branch_is_created_from_main_then_file_is_created() {
    let host = repository_with_main();
    let main_head = host.branch_head("main").expect("main exists");

    let report = publish(&host, &gh_pages_request(b"<html></html>", false))
        .await
        .expect("publish should succeed");

    assert_eq!(
        report.outcome,
        PublishOutcome::FileCreated {
            branch_created: true
        }
    );
    assert_eq!(
        host.operations(),
        vec![
            HostOperation::GetRef {
                branch: "gh-pages".into()
            },
            HostOperation::GetBranchHead {
                branch: "main".into()
            },
            HostOperation::CreateRef {
                branch: "gh-pages".into(),
                sha: main_head.clone()
            },
            HostOperation::GetFile {
                path: "index.html".into(),
                branch: "gh-pages".into()
            },
            HostOperation::PutFile {
                path: "index.html".into(),
                branch: "gh-pages".into(),
                prior_revision_id: None
            },
        ]
    );

    // The new branch carries main's history plus the published file.
    let head = host.branch_head("gh-pages").expect("gh-pages exists");
    assert_eq!(host.commit_parents(&head), Some(vec![main_head]));
    assert_eq!(host.commit_message(&head).as_deref(), Some(UPDATE_COMMIT_MESSAGE));
    assert_eq!(
        host.branch_files("gh-pages"),
        vec!["README.md", "index.html", "src/lib.rs"]
    );
    assert_eq!(
        host.file_content("gh-pages", "index.html").as_deref(),
        Some(b"<html></html>".as_slice())
    );
}

#[tokio::test]
async fn orphan_branch_holds_a_single_parentless_commit_with_only_the_file() {
    let host = repository_with_main();

    let report = publish(&host, &gh_pages_request(b"<html></html>", true))
        .await
        .expect("publish should succeed");

    let head = host.branch_head("gh-pages").expect("gh-pages exists");
    assert_eq!(
        report.outcome,
        PublishOutcome::OrphanBranchCreated {
            commit_sha: head.clone()
        }
    );
    assert_eq!(host.commit_parents(&head), Some(Vec::new()));
    assert_eq!(host.commit_message(&head).as_deref(), Some(ORPHAN_COMMIT_MESSAGE));
    assert_eq!(host.branch_files("gh-pages"), vec!["index.html"]);
    assert_eq!(
        host.file_content("gh-pages", "index.html").as_deref(),
        Some(b"<html></html>".as_slice())
    );

    assert_eq!(host.count(HostOperationKind::CreateTree), 1);
    assert_eq!(host.count(HostOperationKind::CreateCommit), 1);
    assert_eq!(host.count(HostOperationKind::CreateRef), 1);
    assert_eq!(host.count(HostOperationKind::GetBranchHead), 0);
    assert_eq!(host.count(HostOperationKind::GetFile), 0);
    assert_eq!(host.count(HostOperationKind::PutFile), 0);
}

#[tokio::test]
async fn publishing_twice_is_idempotent_at_the_content_level() {
    for orphan in [false, true] {
        let host = repository_with_main();
        let request = gh_pages_request(b"<html>v1</html>", orphan);

        publish(&host, &request).await.expect("first run succeeds");
        let first_head = host.branch_head("gh-pages");
        host.clear_operations();

        let second = publish(&host, &request).await.expect("second run succeeds");

        assert_eq!(
            second.outcome,
            PublishOutcome::FileUpdated {
                branch_created: false
            },
            "orphan={orphan}"
        );
        assert_eq!(
            host.file_content("gh-pages", "index.html").as_deref(),
            Some(b"<html>v1</html>".as_slice())
        );
        // A new revision is still recorded on top of the first run's head.
        let second_head = host.branch_head("gh-pages").expect("gh-pages exists");
        assert_eq!(host.commit_parents(&second_head), first_head.map(|h| vec![h]));
        assert_eq!(host.count(HostOperationKind::CreateRef), 0);
        assert_eq!(host.count(HostOperationKind::PutFile), 1);
    }
}

#[tokio::test]
async fn changed_content_replaces_the_file_on_an_existing_branch() {
    let host = repository_with_main().with_branch("gh-pages", &[("index.html", b"old".as_slice())]);

    let report = publish(&host, &gh_pages_request(b"new", false))
        .await
        .expect("publish should succeed");

    assert_eq!(
        report.outcome,
        PublishOutcome::FileUpdated {
            branch_created: false
        }
    );
    assert_eq!(
        host.file_content("gh-pages", "index.html").as_deref(),
        Some(b"new".as_slice())
    );
    let put = host
        .operations()
        .into_iter()
        .find(|op| op.kind() == HostOperationKind::PutFile)
        .expect("a write was issued");
    match put {
        HostOperation::PutFile {
            prior_revision_id, ..
        } => assert!(prior_revision_id.is_some()),
        other => panic!("unexpected operation {other:?}"),
    }
}

#[tokio::test]
async fn nested_path_is_created_on_an_existing_branch() {
    let host = repository_with_main().with_branch("docs", &[]);
    let request = PublishRequest::new(
        "acme",
        "docs",
        "docs",
        ".//site//api/index.html",
        b"<html/>".to_vec(),
        false,
    )
    .expect("valid request");

    publish(&host, &request).await.expect("publish should succeed");

    assert_eq!(host.branch_files("docs"), vec!["site/api/index.html"]);
}

#[tokio::test]
async fn branch_created_before_a_failed_write_is_left_in_place() {
    let host = repository_with_main().fail_on(
        HostOperationKind::PutFile,
        HostingError::Rejected {
            status: 422,
            message: "Invalid request".into(),
        },
    );

    let err = publish(&host, &gh_pages_request(b"<html></html>", false))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("index.html"), "got: {err}");
    assert_eq!(host.branch_head("gh-pages"), host.branch_head("main"));
    assert_eq!(host.file_content("gh-pages", "index.html"), None);
}

#[tokio::test]
async fn stale_revision_token_makes_the_later_writer_fail() {
    use docs_publish_core::contract::{FileBlob, FileWrite, HostingApi};

    let host = MemoryHost::new().with_branch("gh-pages", &[("index.html", b"v0".as_slice())]);
    let stale = host
        .get_file("index.html", "gh-pages")
        .await
        .expect("file exists")
        .prior_revision_id;

    // Another run lands first.
    publish(&host, &gh_pages_request(b"v1", false))
        .await
        .expect("first writer succeeds");

    let err = host
        .put_file(FileWrite {
            branch: "gh-pages".into(),
            message: UPDATE_COMMIT_MESSAGE.into(),
            blob: FileBlob::new("index.html", b"v2", stale),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HostingError::Rejected { status: 409, .. }), "got: {err:?}");
    assert_eq!(
        host.file_content("gh-pages", "index.html").as_deref(),
        Some(b"v1".as_slice())
    );
}

#[tokio::test]
async fn writes_decode_wrapped_payloads_and_reject_invalid_ones() {
    use docs_publish_core::contract::{FileBlob, FileWrite, HostingApi};

    let host = MemoryHost::new().with_branch("gh-pages", &[]);
    let write = |path: &str, base64_content: &str| FileWrite {
        branch: "gh-pages".into(),
        message: UPDATE_COMMIT_MESSAGE.into(),
        blob: FileBlob {
            path: path.into(),
            prior_revision_id: None,
            base64_content: base64_content.into(),
        },
    };

    host.put_file(write("index.html", "PGh0bWw+\nPC9odG1sPg==\n"))
        .await
        .expect("line-wrapped base64 is accepted");
    assert_eq!(
        host.file_content("gh-pages", "index.html").as_deref(),
        Some(b"<html></html>".as_slice())
    );

    let err = host
        .put_file(write("broken.html", "not base64!"))
        .await
        .unwrap_err();
    assert!(matches!(err, HostingError::Rejected { status: 422, .. }), "got: {err:?}");
    assert_eq!(host.file_content("gh-pages", "broken.html"), None);
}
