use fairjudge_core::db::open_db_in_memory;
use fairjudge_core::model::fair::ModelValidationError;
use fairjudge_core::repo::fair_repo::{
    FairDirectory, FairRepository, NewJudge, NewProject, RepoError, SqliteFairRepository,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

#[test]
fn projects_round_trip_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();
    let physics = repo.create_category("Physics").unwrap();
    let junior = repo.create_division("Junior").unwrap();

    let first = repo
        .create_project(&NewProject {
            title: "  Pendulum clocks ".to_string(),
            category: physics.id,
            subcategory: Some("Mechanics".to_string()),
            division: junior.id,
        })
        .unwrap();
    let second = repo
        .create_project(&NewProject {
            title: "Magnet levitation".to_string(),
            category: physics.id,
            subcategory: None,
            division: junior.id,
        })
        .unwrap();

    assert_eq!(first.title, "Pendulum clocks");
    assert!(first.id < second.id);

    let listed = repo.list_projects().unwrap();
    assert_eq!(listed, vec![first.clone(), second]);
    assert_eq!(repo.get_project(first.id).unwrap(), Some(first));
    assert_eq!(repo.get_project(9_999).unwrap(), None);
}

#[test]
fn update_project_moves_category_and_reports_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();
    let physics = repo.create_category("Physics").unwrap();
    let biology = repo.create_category("Biology").unwrap();
    let senior = repo.create_division("Senior").unwrap();

    let mut project = repo
        .create_project(&NewProject {
            title: "Cell division".to_string(),
            category: physics.id,
            subcategory: None,
            division: senior.id,
        })
        .unwrap();
    project.category = biology.id;
    repo.update_project(&project).unwrap();
    assert_eq!(
        repo.get_project(project.id).unwrap().unwrap().category,
        biology.id
    );

    project.id = 777;
    let err = repo.update_project(&project).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "project",
            id: 777
        }
    ));
}

#[test]
fn blank_names_are_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();

    let err = repo.create_category("   ").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::BlankName("category"))
    ));

    let err = repo
        .create_judge(&NewJudge {
            name: " ".to_string(),
            categories: BTreeSet::new(),
            divisions: BTreeSet::new(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::BlankJudgeName)
    ));
    assert!(repo.list_judges().unwrap().is_empty());
}

#[test]
fn judge_sets_are_replaced_and_activity_toggles() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();
    let physics = repo.create_category("Physics").unwrap();
    let biology = repo.create_category("Biology").unwrap();
    let junior = repo.create_division("Junior").unwrap();
    let senior = repo.create_division("Senior").unwrap();

    let mut judge = repo
        .create_judge(&NewJudge {
            name: "Dr. Okafor".to_string(),
            categories: BTreeSet::from([physics.id, biology.id]),
            divisions: BTreeSet::from([junior.id]),
        })
        .unwrap();
    assert!(judge.active);
    assert_eq!(repo.get_judge(judge.id).unwrap(), Some(judge.clone()));

    judge.categories = BTreeSet::from([biology.id]);
    judge.divisions = BTreeSet::from([junior.id, senior.id]);
    repo.update_judge(&judge).unwrap();
    let stored = repo.get_judge(judge.id).unwrap().unwrap();
    assert_eq!(stored.categories, BTreeSet::from([biology.id]));
    assert_eq!(stored.divisions, BTreeSet::from([junior.id, senior.id]));

    repo.set_judge_active(judge.id, false).unwrap();
    assert!(!repo.get_judge(judge.id).unwrap().unwrap().active);

    let err = repo.set_judge_active(404, false).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "judge", id: 404 }));
}

#[test]
fn listing_categories_and_divisions_is_ordered() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();
    repo.create_category("Physics").unwrap();
    repo.create_category("Chemistry").unwrap();
    repo.create_division("Senior").unwrap();

    let names: Vec<String> = repo
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["Physics", "Chemistry"]);
    assert_eq!(repo.list_divisions().unwrap().len(), 1);
}

#[test]
fn corrupted_active_flag_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         INSERT INTO judges (name, is_active) VALUES ('Broken', 7);",
    )
    .unwrap();
    let repo = SqliteFairRepository::try_new(&conn).unwrap();

    let err = repo.list_judges().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteFairRepository::try_new(&conn)
        .err()
        .expect("unmigrated connection must be rejected");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}
