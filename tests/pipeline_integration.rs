mod common;

use common::{harness, FakeHosting, FakeModel, FakeRegistry};
use periphery::model::LogLevel;
use periphery::storage::AnalysisStatus;
use periphery::PeripheryError;

const FOO_BAR_MANIFEST: &str = r#"{"dependencies":{"foo":"^1.0.0","bar":"~2.3.1"}}"#;

#[tokio::test]
async fn test_single_qualifying_repository() {
    let h = harness(
        FakeRegistry::default().with_repo("foo", "git+https://host/org1/foo.git"),
        FakeHosting::default()
            .commits("org1/foo", "bob", 12)
            .issues("org1/foo", "carol", 3),
        FakeModel::replying(r#"{"foo":{"relevance":0.9,"niche":0.6}}"#),
    );
    let project = h
        .db
        .create_project("web", "", FOO_BAR_MANIFEST, None)
        .expect("Failed to create project");

    let summary = h
        .app
        .start_analysis(&project.id)
        .await
        .expect("Analysis failed");

    assert_eq!(summary.dependencies, 2);
    assert_eq!(summary.with_repository, 1);
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.progress.total_repos, 1);
    assert!(summary.progress.finished);
    println!("✓ Research stage counted 2 deps, 1 resolvable");

    let deps = h.app.list_dependencies(&project.id).unwrap();
    let foo = deps.iter().find(|d| d.package_name == "foo").unwrap();
    let bar = deps.iter().find(|d| d.package_name == "bar").unwrap();
    assert_eq!(foo.repository_url.as_deref(), Some("https://host/org1/foo"));
    assert!((foo.signal().unwrap() - 0.54).abs() < 1e-9);
    assert_eq!(bar.repository_url, None);
    assert_eq!(bar.scores, None);

    let qualifying = h.app.list_qualifying(&project.id).unwrap();
    assert_eq!(qualifying.len(), 1);
    assert_eq!(qualifying[0].package_name, "foo");

    // bar never reaches the model or the scraper
    let prompts = h.model.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(r#"Packages: ["foo"]"#));
    assert_eq!(h.hosting.fetched(), vec!["org1/foo"]);

    let people = h.app.list_influence(&project.id).unwrap();
    let summary: Vec<_> = people
        .iter()
        .map(|p| (p.username.as_str(), p.commits, p.issues))
        .collect();
    assert_eq!(summary, vec![("bob", 12, 0), ("carol", 0, 3)]);

    let record = h.db.require_project(&project.id).unwrap();
    assert_eq!(record.analysis_status, AnalysisStatus::Complete);
    println!("✓ Scrape aggregated influence for org1/foo");
}

#[tokio::test]
async fn test_org_members_excluded() {
    let h = harness(
        FakeRegistry::default().with_repo("foo", "https://host/org1/foo"),
        FakeHosting::default()
            .member("org1", "alice")
            .commits("org1/foo", "alice", 10)
            .commits("org1/foo", "bob", 2)
            .issues("org1/foo", "alice", 4),
        FakeModel::replying(r#"{"foo":{"relevance":1,"niche":1}}"#),
    );
    let project = h
        .db
        .create_project("web", "", r#"{"dependencies":{"foo":"1"}}"#, None)
        .unwrap();

    h.app.start_analysis(&project.id).await.unwrap();

    assert!(h.db.get_user_influence(&project.id, "alice").unwrap().is_none());
    let rows = h.db.list_repo_influence(&project.id, "org1", "foo").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "bob");

    let logs = h.app.list_logs(&project.id).unwrap();
    let exclusion = logs
        .iter()
        .find(|e| e.step.as_deref() == Some("exclude_org_members"))
        .expect("exclusion should be logged");
    assert_eq!(exclusion.message, "Excluded 2 org member(s) from org1");
    println!("✓ Public org member alice never credited");
}

#[tokio::test]
async fn test_shared_repository_scraped_per_dependency() {
    let h = harness(
        FakeRegistry::default()
            .with_repo("foo", "https://host/org1/foo")
            .with_repo("foo-lite", "git+https://host/org1/foo.git"),
        FakeHosting::default().commits("org1/foo", "bob", 5),
        FakeModel::replying(
            r#"{"foo":{"relevance":0.8,"niche":0.8},"foo-lite":{"relevance":0.7,"niche":0.9}}"#,
        ),
    );
    let project = h
        .db
        .create_project(
            "web",
            "",
            r#"{"dependencies":{"foo":"1","foo-lite":"1"}}"#,
            None,
        )
        .unwrap();

    let summary = h.app.start_analysis(&project.id).await.unwrap();

    assert_eq!(summary.progress.total_repos, 2);
    assert_eq!(h.hosting.fetched(), vec!["org1/foo", "org1/foo"]);
    let bob = h.db.get_user_influence(&project.id, "bob").unwrap().unwrap();
    assert_eq!(bob.commits, 10);
    let rows = h.db.list_repo_influence(&project.id, "org1", "foo").unwrap();
    assert_eq!(rows[0].commits, 10);
    println!("✓ Shared repository counted once per dependency");
}

#[tokio::test]
async fn test_unparseable_scores_exclude_everything() {
    let h = harness(
        FakeRegistry::default()
            .with_repo("foo", "https://host/org1/foo")
            .with_repo("baz", "https://host/org2/baz"),
        FakeHosting::default(),
        FakeModel::replying("I'd rather not say."),
    );
    let project = h
        .db
        .create_project("web", "", r#"{"dependencies":{"foo":"1","baz":"2"}}"#, None)
        .unwrap();

    let summary = h.app.start_analysis(&project.id).await.unwrap();

    let deps = h.app.list_dependencies(&project.id).unwrap();
    assert!(deps.iter().all(|d| d.signal() == Some(0.0)));
    assert!(h.app.list_qualifying(&project.id).unwrap().is_empty());

    let progress = summary.progress;
    assert_eq!((progress.total_repos, progress.processed_repos, progress.percent), (0, 0, 100));
    assert!(progress.finished);
    assert!(h.hosting.fetched().is_empty());

    let messages: Vec<_> = h
        .app
        .list_logs(&project.id)
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(
        messages,
        vec!["Finished scrape for 0 repos", "Starting scrape for 0 repos"]
    );
}

#[tokio::test]
async fn test_scores_for_urlless_dependencies_ignored() {
    let h = harness(
        FakeRegistry::default()
            .with_repo("foo", "https://host/org1/foo")
            .without_repo("nourl"),
        FakeHosting::default(),
        FakeModel::replying(
            r#"{"foo":{"relevance":0.1,"niche":0.1},"nourl":{"relevance":1,"niche":1}}"#,
        ),
    );
    let project = h
        .db
        .create_project("web", "", r#"{"dependencies":{"foo":"1","nourl":"1"}}"#, None)
        .unwrap();

    let summary = h.app.start_analysis(&project.id).await.unwrap();

    assert_eq!(summary.scored, 1);
    let deps = h.app.list_dependencies(&project.id).unwrap();
    let nourl = deps.iter().find(|d| d.package_name == "nourl").unwrap();
    assert_eq!(nourl.scores, None);
    assert_eq!(summary.progress.total_repos, 0);
}

#[tokio::test]
async fn test_no_resolvable_dependencies_skips_model() {
    let h = harness(
        FakeRegistry::default(),
        FakeHosting::default(),
        FakeModel::failing(),
    );
    let project = h
        .db
        .create_project("web", "", FOO_BAR_MANIFEST, None)
        .unwrap();

    let summary = h.app.start_analysis(&project.id).await.unwrap();

    assert_eq!(h.model.calls(), 0);
    assert_eq!(summary.with_repository, 0);
    assert!(summary.progress.finished);
}

#[tokio::test]
async fn test_model_failure_marks_analysis_failed() {
    let h = harness(
        FakeRegistry::default().with_repo("foo", "https://host/org1/foo"),
        FakeHosting::default(),
        FakeModel::failing(),
    );
    let project = h
        .db
        .create_project("web", "", FOO_BAR_MANIFEST, None)
        .unwrap();

    let err = h.app.start_analysis(&project.id).await.unwrap_err();
    assert!(matches!(err, PeripheryError::Scoring(_)));

    let record = h.db.require_project(&project.id).unwrap();
    assert_eq!(record.analysis_status, AnalysisStatus::Failed);
    assert!(h.app.get_progress(&project.id).unwrap().is_none());

    // Dependency rows written before the failure stay, unscored
    let deps = h.app.list_dependencies(&project.id).unwrap();
    assert_eq!(deps.len(), 2);
    assert!(deps.iter().all(|d| d.scores.is_none()));
}

#[tokio::test]
async fn test_unknown_project() {
    let h = harness(
        FakeRegistry::default(),
        FakeHosting::default(),
        FakeModel::failing(),
    );
    let err = h.app.start_analysis("missing").await.unwrap_err();
    assert!(matches!(err, PeripheryError::ProjectNotFound { .. }));
}

#[tokio::test]
async fn test_manifests_aggregated_first_seen() {
    let h = harness(
        FakeRegistry::default().with_repo("foo", "https://host/org1/foo"),
        FakeHosting::default(),
        FakeModel::replying("{}"),
    );
    let project = h
        .db
        .create_project("web", "", r#"{"dependencies":{"foo":"1.0.0"}}"#, None)
        .unwrap();
    h.db
        .add_manifest(
            &project.id,
            "packages/app/package.json",
            r#"{"dependencies":{"foo":"2.0.0"},"devDependencies":{"vitest":"^1"}}"#,
        )
        .unwrap();

    h.app.start_analysis(&project.id).await.unwrap();

    let deps = h.db.dependencies_in_order(&project.id).unwrap();
    let names: Vec<_> = deps
        .iter()
        .map(|d| (d.package_name.as_str(), d.version_spec.as_str()))
        .collect();
    assert_eq!(names, vec![("foo", "1.0.0"), ("vitest", "^1")]);
}

#[tokio::test]
async fn test_user_detail_links() {
    let h = harness(
        FakeRegistry::default()
            .with_repo("foo", "https://host/org1/foo")
            .with_repo("baz", "https://host/org2/baz"),
        FakeHosting::default()
            .commits("org1/foo", "bob", 2)
            .commits("org2/baz", "bob", 9)
            .issues("org2/baz", "bob", 1),
        FakeModel::replying(
            r#"{"foo":{"relevance":1,"niche":1},"baz":{"relevance":1,"niche":1}}"#,
        ),
    );
    let project = h
        .db
        .create_project("web", "", r#"{"dependencies":{"foo":"1","baz":"1"}}"#, None)
        .unwrap();
    h.app.start_analysis(&project.id).await.unwrap();

    let detail = h.app.user_detail(&project.id, "bob").unwrap();
    assert_eq!((detail.commits, detail.issues), (11, 1));
    assert_eq!(detail.profile_url.as_deref(), Some("https://host/bob"));
    assert_eq!(detail.affected_repos, 2);
    assert_eq!(detail.total_relevant_repos, 2);
    assert_eq!(detail.repos[0].repo_url, "https://host/org2/baz");
    assert_eq!(
        detail.repos[0].issues_url,
        "https://host/org2/baz/issues?q=author%3Abob"
    );

    let nobody = h.app.user_detail(&project.id, "nobody").unwrap();
    assert_eq!((nobody.commits, nobody.issues, nobody.affected_repos), (0, 0, 0));

    let levels: Vec<_> = h
        .app
        .list_logs(&project.id)
        .unwrap()
        .into_iter()
        .map(|e| e.level)
        .collect();
    assert!(levels.iter().all(|l| *l == LogLevel::Info));
}
