use histograph_core::{InfoboxData, Node, NodeKind, NodeSink};

use crate::common::{SEED, node, setup_test_db};

#[tokio::test]
#[ignore = "requires Docker"]
async fn assigns_ids_per_kind() {
    let (db, _container) = setup_test_db().await;
    let repo = db.node_repo();

    let seed = node("Korean War", NodeKind::Event, 0, None);
    let macarthur = node("Douglas MacArthur", NodeKind::Person, 1, Some(SEED));
    let kim = node("Kim Il Sung", NodeKind::Person, 1, Some(SEED));
    let inchon = node("Battle of Inchon", NodeKind::Event, 2, Some(macarthur.url()));

    assert_eq!(repo.save_node(&seed, None).await.unwrap(), "e1");
    assert_eq!(repo.save_node(&macarthur, None).await.unwrap(), "p1");
    assert_eq!(repo.save_node(&kim, None).await.unwrap(), "p2");
    assert_eq!(repo.persist(&inchon, None).await.unwrap(), "e2");

    let all = repo.all_nodes().await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "p1", "p2", "e2"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn existing_url_keeps_id_and_refreshes_fields() {
    let (db, _container) = setup_test_db().await;
    let repo = db.node_repo();

    let bare = node("Korean War", NodeKind::Event, 0, None);
    assert_eq!(repo.save_node(&bare, None).await.unwrap(), "e1");

    let enriched = Node::builder("Korean War", bare.url(), NodeKind::Event)
        .infobox(InfoboxData {
            start_date: "25 June 1950".into(),
            end_date: "27 July 1953".into(),
            metadata: [("Location".to_string(), "Korean Peninsula".to_string())].into(),
            ..Default::default()
        })
        .build()
        .unwrap();
    assert_eq!(repo.save_node(&enriched, None).await.unwrap(), "e1");

    let stored = repo.find_by_url(bare.url()).await.unwrap().unwrap();
    assert_eq!(stored.node_id, "e1");
    assert_eq!(stored.start_date, "25 June 1950");
    assert_eq!(stored.end_date, "27 July 1953");
    assert_eq!(
        stored.metadata.get("Location").map(String::as_str),
        Some("Korean Peninsula")
    );
    assert_eq!(repo.all_nodes().await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn lookups_by_id_and_title_parent() {
    let (db, _container) = setup_test_db().await;
    let repo = db.node_repo();

    repo.save_node(&node("Korean War", NodeKind::Event, 0, None), None)
        .await
        .unwrap();
    repo.save_node(
        &node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)),
        None,
    )
    .await
    .unwrap();

    let kim = repo.find_by_node_id("p1").await.unwrap().unwrap();
    assert_eq!(kim.title, "Kim Il Sung");
    assert_eq!(kim.parent_url.as_deref(), Some(SEED));

    let seed = repo
        .find_by_title_parent("Korean War", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seed.node_id, "e1");

    assert!(
        repo.find_by_title_parent("Kim Il Sung", Some("https://w.test/wiki/Other"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.find_by_node_id("p9").await.unwrap().is_none());
}
