use fairjudge_core::db::open_db_in_memory;
use fairjudge_core::repo::assignment_repo::{AssignmentStore, SqliteAssignmentStore, StoreError};
use fairjudge_core::repo::fair_repo::{FairRepository, NewJudge, NewProject, SqliteFairRepository};
use rusqlite::Connection;
use std::collections::BTreeSet;
use uuid::Uuid;

const RUBRIC: i64 = 1;

struct Seeded {
    judges: Vec<i64>,
    projects: Vec<i64>,
}

fn seed(conn: &Connection, judges: usize, projects: usize) -> Seeded {
    let repo = SqliteFairRepository::try_new(conn).unwrap();
    let category = repo.create_category("Physics").unwrap();
    let division = repo.create_division("Junior").unwrap();
    let judges = (0..judges)
        .map(|index| {
            repo.create_judge(&NewJudge {
                name: format!("Judge {index}"),
                categories: BTreeSet::from([category.id]),
                divisions: BTreeSet::from([division.id]),
            })
            .unwrap()
            .id
        })
        .collect();
    let projects = (0..projects)
        .map(|index| {
            repo.create_project(&NewProject {
                title: format!("Project {index}"),
                category: category.id,
                subcategory: None,
                division: division.id,
            })
            .unwrap()
            .id
        })
        .collect();
    Seeded { judges, projects }
}

#[test]
fn create_counts_and_lists_assignments() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 2, 2);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    let (j1, j2) = (seeded.judges[0], seeded.judges[1]);
    let (p1, p2) = (seeded.projects[0], seeded.projects[1]);

    let first = store.create(j1, p1, RUBRIC).unwrap();
    store.create(j2, p1, RUBRIC).unwrap();
    store.create(j1, p2, RUBRIC).unwrap();

    assert!(!first.has_response);
    assert_eq!(store.count_for_project(p1, RUBRIC).unwrap(), 2);
    assert_eq!(store.count_for_judge(j1, RUBRIC).unwrap(), 2);
    assert_eq!(store.count_for_judge(j2, RUBRIC).unwrap(), 1);
    assert!(store.exists(j1, p1, RUBRIC).unwrap());
    assert!(!store.exists(j2, p2, RUBRIC).unwrap());

    assert_eq!(store.get(first.id).unwrap(), Some(first.clone()));
    assert_eq!(store.list_for_rubric(RUBRIC).unwrap().len(), 3);
    let for_project: Vec<i64> = store
        .list_for_project(p1, RUBRIC)
        .unwrap()
        .into_iter()
        .map(|assignment| assignment.judge)
        .collect();
    assert_eq!(for_project, vec![j1, j2]);
    assert_eq!(store.list_for_judge(j2, RUBRIC).unwrap().len(), 1);
}

#[test]
fn duplicate_triple_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 1, 1);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    let (judge, project) = (seeded.judges[0], seeded.projects[0]);

    store.create(judge, project, RUBRIC).unwrap();
    let err = store.create(judge, project, RUBRIC).unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateAssignment { judge: j, project: p, rubric: RUBRIC } if j == judge && p == project
    ));
    assert_eq!(store.count_for_project(project, RUBRIC).unwrap(), 1);
}

#[test]
fn same_pair_under_another_rubric_is_independent() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 1, 1);
    let finals = SqliteFairRepository::try_new(&conn)
        .unwrap()
        .create_rubric("Finals")
        .unwrap();
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    let (judge, project) = (seeded.judges[0], seeded.projects[0]);

    store.create(judge, project, RUBRIC).unwrap();
    store.create(judge, project, finals.id).unwrap();

    assert_eq!(store.count_for_judge(judge, RUBRIC).unwrap(), 1);
    assert_eq!(store.count_for_judge(judge, finals.id).unwrap(), 1);
}

#[test]
fn scored_assignment_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 1, 1);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();

    let assignment = store
        .create(seeded.judges[0], seeded.projects[0], RUBRIC)
        .unwrap();
    store
        .record_response(assignment.id, "creativity", "4")
        .unwrap();
    store
        .record_response(assignment.id, "creativity", "5")
        .unwrap();

    assert!(store.has_response(assignment.id).unwrap());
    assert!(store.get(assignment.id).unwrap().unwrap().has_response);
    let err = store.delete(assignment.id).unwrap_err();
    assert!(matches!(err, StoreError::ProtectedAssignment(id) if id == assignment.id));
    assert!(store.get(assignment.id).unwrap().is_some());

    let answers: i64 = conn
        .query_row("SELECT COUNT(*) FROM responses;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(answers, 1);
}

#[test]
fn foreign_key_blocks_deleting_scored_rows_directly() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 1, 1);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    let assignment = store
        .create(seeded.judges[0], seeded.projects[0], RUBRIC)
        .unwrap();
    store.record_response(assignment.id, "method", "3").unwrap();

    let deleted = conn.execute(
        "DELETE FROM assignments WHERE uuid = ?1;",
        [assignment.id.to_string()],
    );
    assert!(deleted.is_err());
}

#[test]
fn delete_and_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let seeded = seed(&conn, 1, 1);
    let store = SqliteAssignmentStore::try_new(&conn).unwrap();
    let assignment = store
        .create(seeded.judges[0], seeded.projects[0], RUBRIC)
        .unwrap();

    store.delete(assignment.id).unwrap();
    assert_eq!(store.get(assignment.id).unwrap(), None);
    assert!(matches!(
        store.delete(assignment.id).unwrap_err(),
        StoreError::NotFound(_)
    ));

    let missing = Uuid::new_v4();
    assert!(matches!(
        store.record_response(missing, "q", "a").unwrap_err(),
        StoreError::NotFound(id) if id == missing
    ));
}
