use histograph_core::{KindCounts, NewSession, NodeKind, SessionStatus};

use crate::common::{SEED, node, setup_test_db};

#[tokio::test]
#[ignore = "requires Docker"]
async fn session_lifecycle() {
    let (db, _container) = setup_test_db().await;
    let sessions = db.session_repo();

    let id = sessions
        .create(&NewSession::new("Korean War run", SEED, 2))
        .await
        .unwrap();

    let running = sessions.get(id).await.unwrap().unwrap();
    assert_eq!(running.status, SessionStatus::Running);
    assert_eq!(running.max_degree, 2);
    assert!(running.completed_at.is_none());

    sessions
        .update_status(id, SessionStatus::Failed, 3, Some("disk full"))
        .await
        .unwrap();

    let failed = sessions.get(id).await.unwrap().unwrap();
    assert_eq!(failed.status, SessionStatus::Failed);
    assert_eq!(failed.total_nodes, 3);
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));
    assert!(failed.completed_at.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn unknown_session_update_is_an_error() {
    let (db, _container) = setup_test_db().await;

    let result = db
        .session_repo()
        .update_status(uuid::Uuid::new_v4(), SessionStatus::Completed, 0, None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn session_nodes_and_summary() {
    let (db, _container) = setup_test_db().await;
    let sessions = db.session_repo();
    let nodes = db.node_repo();

    let id = sessions
        .create(&NewSession::new("Korean War run", SEED, 1))
        .await
        .unwrap();
    let other = sessions
        .create(&NewSession::new("Other run", SEED, 0))
        .await
        .unwrap();

    let seed = node("Korean War", NodeKind::Event, 0, None);
    nodes.save_node(&seed, Some(id)).await.unwrap();
    nodes
        .save_node(&node("Kim Il Sung", NodeKind::Person, 1, Some(SEED)), Some(id))
        .await
        .unwrap();
    nodes
        .save_node(
            &node("Douglas MacArthur", NodeKind::Person, 1, Some(SEED)),
            Some(id),
        )
        .await
        .unwrap();
    // Saving the same url for another session links, not duplicates.
    nodes.save_node(&seed, Some(other)).await.unwrap();

    let linked = sessions.session_nodes(id).await.unwrap();
    let titles: Vec<_> = linked.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Korean War", "Douglas MacArthur", "Kim Il Sung"]);

    let degree_one = sessions.nodes_at_degree(id, 1).await.unwrap();
    assert_eq!(degree_one.len(), 2);
    assert_eq!(sessions.session_nodes(other).await.unwrap().len(), 1);

    let summary = sessions.summary(id).await.unwrap().unwrap();
    assert_eq!(summary.session.name, "Korean War run");
    assert_eq!(
        summary.degree_counts.get(&0),
        Some(&KindCounts {
            events: 1,
            people: 0
        })
    );
    assert_eq!(
        summary.degree_counts.get(&1),
        Some(&KindCounts {
            events: 0,
            people: 2
        })
    );

    let listed = sessions.list(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(sessions.summary(uuid::Uuid::new_v4()).await.unwrap().is_none());
}
