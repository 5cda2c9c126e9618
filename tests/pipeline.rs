//! End-to-end pipeline tests: upload → validate → store → filter → KPIs.

use edustat::data::model::CellValue;
use edustat::data::validate::DatasetKind;
use edustat::query::filter::ColumnFilter;
use edustat::session::{Session, SessionConfig, SessionError};

/// Habits-shaped CSV with 50 male rows at score 85 and 50 female rows
/// at score 88, spread over two attendance bands.
fn habits_csv() -> String {
    let mut out = String::from(
        "student_id,gender,study_hours_per_day,attendance_percentage,sleep_hours,exam_score\n",
    );
    for i in 0..50 {
        let attendance = if i % 2 == 0 { 95.0 } else { 82.0 };
        out.push_str(&format!(
            "M{i:03},Male,3.0,{attendance},7.0,85.0\n"
        ));
    }
    for i in 0..50 {
        let attendance = if i % 2 == 0 { 91.0 } else { 88.0 };
        out.push_str(&format!(
            "F{i:03},Female,4.0,{attendance},6.5,88.0\n"
        ));
    }
    out
}

fn factors_csv() -> String {
    let mut out = String::from(
        "Hours_Studied,Attendance,Sleep_Hours,Previous_Scores,Gender,Exam_Score\n",
    );
    for i in 0..20 {
        let hours = 10 + i % 5;
        let score = 60 + i;
        out.push_str(&format!("{hours},85,7,70,Male,{score}\n"));
    }
    out
}

fn loaded_session() -> Session {
    let mut session = Session::new(SessionConfig::default()).unwrap();
    session
        .ingest("habits.csv", habits_csv().as_bytes(), DatasetKind::Habits)
        .unwrap();
    session
        .ingest("factors.csv", factors_csv().as_bytes(), DatasetKind::Factors)
        .unwrap();
    session
}

#[test]
fn both_dataset_shapes_import_side_by_side() {
    let session = loaded_session();
    let tables = session.store().tables().unwrap();
    assert!(tables.contains("student_habits_performance"));
    assert!(tables.contains("student_performance_factors"));
}

#[test]
fn kpi_one_matches_the_group_fixture() {
    let session = loaded_session();
    let kpis = session.kpis(DatasetKind::Habits).unwrap();
    let (name, by_category) = &kpis[0];
    assert_eq!(*name, "score_by_category");
    assert_eq!(
        by_category.columns,
        vec!["group", "average_score", "count"]
    );
    assert_eq!(by_category.len(), 2);
    assert_eq!(by_category.rows[0][0], CellValue::Text("Female".into()));
    assert_eq!(by_category.rows[0][1], CellValue::Float(88.0));
    assert_eq!(by_category.rows[0][2], CellValue::Integer(50));
    assert_eq!(by_category.rows[1][0], CellValue::Text("Male".into()));
    assert_eq!(by_category.rows[1][1], CellValue::Float(85.0));
    assert_eq!(by_category.rows[1][2], CellValue::Integer(50));
}

#[test]
fn all_four_kpis_are_nonempty_under_a_passing_range_filter() {
    let mut session = loaded_session();
    session.set_filter(
        "attendance_percentage",
        ColumnFilter::Range { lo: 0.0, hi: 100.0 },
    );
    let kpis = session.kpis(DatasetKind::Habits).unwrap();
    assert_eq!(kpis.len(), 4);
    for (name, table) in &kpis {
        assert!(!table.is_empty(), "KPI '{name}' unexpectedly empty");
    }
}

#[test]
fn excluding_filter_yields_empty_tables_not_errors() {
    let mut session = loaded_session();
    session.set_filter(
        "attendance_percentage",
        ColumnFilter::Range { lo: -10.0, hi: -5.0 },
    );
    let kpis = session.kpis(DatasetKind::Habits).unwrap();
    assert_eq!(kpis.len(), 4);
    for (name, table) in &kpis {
        assert!(table.is_empty(), "KPI '{name}' should be empty");
        assert!(!table.columns.is_empty());
    }
}

#[test]
fn range_filter_narrows_attendance_bands() {
    let mut session = loaded_session();
    session.set_filter(
        "attendance_percentage",
        ColumnFilter::Range { lo: 90.0, hi: 100.0 },
    );
    let kpis = session.kpis(DatasetKind::Habits).unwrap();
    let (_, bands) = &kpis[2];
    // Only the 90–100 band survives: 25 male rows at 95 plus 25 female at 91.
    assert_eq!(bands.len(), 1);
    assert_eq!(bands.rows[0][0], CellValue::Integer(90));
    assert_eq!(bands.rows[0][2], CellValue::Integer(50));
}

#[test]
fn reimport_with_replace_keeps_one_relation_with_new_rows() {
    let mut session = loaded_session();
    let before = session
        .store()
        .count_rows("student_habits_performance", "", &[])
        .unwrap();
    assert_eq!(before, 100);

    let smaller = "\
student_id,gender,study_hours_per_day,attendance_percentage,sleep_hours,exam_score
Z1,Male,2.0,75.0,8.0,70.0
";
    session
        .ingest("habits2.csv", smaller.as_bytes(), DatasetKind::Habits)
        .unwrap();
    let after = session
        .store()
        .count_rows("student_habits_performance", "", &[])
        .unwrap();
    assert_eq!(after, 1);
}

#[test]
fn factors_kpis_use_their_own_columns() {
    let session = loaded_session();
    let kpis = session.kpis(DatasetKind::Factors).unwrap();
    let (_, scatter) = &kpis[1];
    assert_eq!(scatter.columns, vec!["hours_studied", "exam_score"]);
    assert_eq!(scatter.len(), 20);
}

#[test]
fn one_bad_upload_does_not_poison_the_next() {
    let mut session = Session::new(SessionConfig::default()).unwrap();
    let err = session
        .ingest("bad.csv", &[0xff, 0xfe], DatasetKind::Habits)
        .unwrap_err();
    assert!(matches!(err, SessionError::Ingest(_)));

    session
        .ingest("habits.csv", habits_csv().as_bytes(), DatasetKind::Habits)
        .unwrap();
    assert!(session.is_loaded(DatasetKind::Habits));
}

#[test]
fn teardown_releases_the_store() {
    let session = loaded_session();
    session.teardown().unwrap();
}
