use fairjudge_core::config::JudgingConfig;
use fairjudge_core::db::{open_db, open_db_in_memory};
use fairjudge_core::engine::EngineError;
use fairjudge_core::repo::assignment_repo::{AssignmentStore, SqliteAssignmentStore};
use fairjudge_core::repo::fair_repo::{
    FairDirectory, FairRepository, NewJudge, NewProject, RepoError, SqliteFairRepository,
};
use fairjudge_core::service::{JudgingService, ServiceError};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::time::Duration;

fn seed(conn: &Connection) -> (i64, i64) {
    let repo = SqliteFairRepository::try_new(conn).unwrap();
    let category = repo.create_category("Physics").unwrap().id;
    let division = repo.create_division("Junior").unwrap().id;
    for name in ["Ada", "Grace"] {
        repo.create_judge(&NewJudge {
            name: name.to_string(),
            categories: BTreeSet::from([category]),
            divisions: BTreeSet::from([division]),
        })
        .unwrap();
    }
    for title in ["Pendulum", "Lenses"] {
        repo.create_project(&NewProject {
            title: title.to_string(),
            category,
            subcategory: None,
            division,
        })
        .unwrap();
    }
    (category, division)
}

fn assignment_count(conn: &Connection) -> usize {
    SqliteAssignmentStore::try_new(conn)
        .unwrap()
        .list_for_rubric(1)
        .unwrap()
        .len()
}

#[test]
fn full_rebalance_commits_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fair.sqlite3");
    {
        let conn = open_db(&path).unwrap();
        seed(&conn);
        let service = JudgingService::new(&conn, JudgingConfig::new(1, 1, 1));
        let report = service.run_full_rebalance().unwrap();
        assert_eq!(report.created.len(), 2);
    }

    let reopened = open_db(&path).unwrap();
    assert_eq!(assignment_count(&reopened), 2);
    let service = JudgingService::new(&reopened, JudgingConfig::new(1, 1, 1));
    assert!(service.run_full_rebalance().unwrap().is_noop());
}

#[test]
fn deactivate_judge_updates_flag_and_rebalances_together() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = JudgingService::new(&conn, JudgingConfig::new(1, 1, 1));
    service.run_full_rebalance().unwrap();

    let judges = SqliteFairRepository::try_new(&conn)
        .unwrap()
        .list_judges()
        .unwrap();
    let leaving = judges[0].id;
    let report = service.deactivate_judge(leaving).unwrap();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.created.len(), 1);
    let repo = SqliteFairRepository::try_new(&conn).unwrap();
    assert!(!repo.get_judge(leaving).unwrap().unwrap().active);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    assert_eq!(store.count_for_judge(leaving, 1).unwrap(), 0);
    assert_eq!(store.count_for_judge(judges[1].id, 1).unwrap(), 2);
}

#[test]
fn failed_run_rolls_back_entity_edit() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = JudgingService::new(&conn, JudgingConfig::new(1, 1, 1));

    let err = service.deactivate_judge(404).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::Repo(RepoError::NotFound { entity: "judge", id: 404 }))
    ));

    let err = service.run_for_changed_project(404).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ProjectNotFound(404))
    ));
    assert_eq!(assignment_count(&conn), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn concurrent_writer_blocks_a_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fair.sqlite3");
    let holder = open_db(&path).unwrap();
    seed(&holder);
    let contender = open_db(&path).unwrap();
    contender.busy_timeout(Duration::from_millis(50)).unwrap();

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let service = JudgingService::new(&contender, JudgingConfig::default());
    let err = service.run_full_rebalance().unwrap_err();
    assert!(err.is_busy(), "unexpected error: {err}");
    holder.execute_batch("COMMIT;").unwrap();

    let report = service.run_full_rebalance().unwrap();
    assert!(!report.created.is_empty());
}
