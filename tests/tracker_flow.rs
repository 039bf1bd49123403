use chrono::NaiveDate;
use lunara::Tracker;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn register_login_record_and_predict() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::open(dir.path().join("data.lunara"), "integration-pass").unwrap();

    let profile = tracker
        .register("ada", "ada@example.com", "correct horse".into())
        .unwrap();
    assert_eq!(profile.username, "ada");

    let token = tracker.login("ada", "correct horse".into()).unwrap().token;

    tracker
        .add_record(token, date("2024-08-02"), Some(date("2024-08-15")))
        .unwrap();
    tracker
        .add_record(token, date("2024-09-02"), Some(date("2024-09-16")))
        .unwrap();
    tracker.add_record(token, date("2024-10-01"), None).unwrap();

    let listed = tracker.records(token).unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].length, None);
    assert_eq!(listed[1].length, Some(31));
    assert_eq!(listed[2].length, Some(29));

    assert_eq!(
        tracker.last_record(token).unwrap().start_date,
        date("2024-10-01")
    );

    let stats = tracker.statistics_on(token, date("2024-10-08")).unwrap();
    assert_eq!(stats.averages.avg_length, 30);
    assert_eq!(stats.averages.avg_ovulation, 14);
    assert_eq!(stats.predictions.day, 8);
    assert_eq!(stats.predictions.next_period, date("2024-10-31"));
    assert_eq!(stats.predictions.days_to_next, 23);
    assert_eq!(stats.predictions.next_ovulation, Some(date("2024-10-15")));
    assert_eq!(stats.predictions.days_to_ovul, Some(7));
}

#[test]
fn statistics_refuse_partial_data_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Tracker::open(dir.path().join("data.lunara"), "integration-pass").unwrap();

    tracker
        .register("ada", "ada@example.com", "pw".into())
        .unwrap();
    tracker
        .register("eve", "eve@example.com", "pw".into())
        .unwrap();
    let ada = tracker.login("ada", "pw".into()).unwrap().token;
    let eve = tracker.login("eve", "pw".into()).unwrap().token;

    // Ada has plenty of history; Eve has one record. Eve's statistics must
    // fail regardless of what other owners have stored.
    tracker.add_record(ada, date("2024-08-02"), None).unwrap();
    tracker.add_record(ada, date("2024-09-02"), None).unwrap();
    tracker.add_record(eve, date("2024-09-10"), None).unwrap();

    assert!(tracker.statistics_on(ada, date("2024-10-08")).is_ok());
    assert!(matches!(
        tracker.statistics_on(eve, date("2024-10-08")),
        Err(lunara::ServiceError::InsufficientHistory)
    ));
}
