mod support;

use support::{MockBackend, MockFactory, PageModel, events_with_prefix, new_log};
use trolley_engine::addresses::AddressBook;
use trolley_engine::backend::Backend;
use trolley_engine::config::RetrySettings;
use trolley_engine::cursor::PersistentCursor;
use trolley_engine::flow::{CheckoutPipeline, CheckoutPlan, FormFields, StepControl};
use trolley_engine::protocol::{AddressRecord, AttemptResult, DelayRange};
use trolley_engine::runner::{RunController, RunError, RunPolicy};

fn fast_plan() -> CheckoutPlan {
    CheckoutPlan {
        product_urls: vec!["https://shop.example.com/products/widget".into()],
        cart_url: None,
        navigation_timeout_ms: 1_000,
        add_to_cart: StepControl::default(),
        checkout: StepControl::default(),
        form_anchor: r#"input[name="first_name"]"#.into(),
        form_anchor_timeout_ms: 10,
        fields: FormFields {
            field_timeout_ms: 10,
            ..FormFields::default()
        },
        pay: StepControl::default(),
        success_pattern: "thank_you".into(),
        settle_ms: 0,
        classify_settle_ms: 0,
        type_delay: DelayRange::new(0, 0),
    }
}

fn fast_retry() -> RetrySettings {
    RetrySettings {
        attempts_per_candidate: 1,
        retry_interval_ms: 1,
    }
}

fn record(first: &str, last: &str) -> AddressRecord {
    AddressRecord {
        first_name: first.into(),
        last_name: last.into(),
        address1: "12 MG Road".into(),
        address2: String::new(),
        city: "Pune".into(),
        postal_code: "411001".into(),
        zone: "Maharashtra".into(),
    }
}

/// Page model where the whole flow works and lands on a confirmation URL.
fn happy_model() -> PageModel {
    let fields = FormFields::default();
    PageModel {
        region_options: vec!["Maharashtra".into()],
        final_url: "https://shop.example.com/checkouts/thank_you".into(),
        ..PageModel::default()
    }
    .with_present(&[
        r#"input[name="first_name"]"#,
        fields.phone.as_str(),
        fields.address1.as_str(),
        fields.address2.as_str(),
        fields.city.as_str(),
        fields.postal_code.as_str(),
    ])
}

#[tokio::test]
async fn wrapping_walk_consumes_records_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state").join("last_index.json");
    PersistentCursor::new(&state_path).save(2);

    let log = new_log();
    let book = AddressBook::from_records(vec![
        record("Zero", "Z"),
        record("One", "O"),
        record("Two", "T"),
    ]);
    let factory = MockFactory {
        model: happy_model(),
        log: log.clone(),
    };
    let controller = RunController::new(
        book,
        PersistentCursor::new(&state_path),
        factory,
        RunPolicy {
            max_iterations: 5,
            stop_on_inconclusive: false,
        },
    );

    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);
    let summary = controller.run(&pipeline).await.unwrap();

    assert_eq!(summary.iterations, 5);
    assert_eq!(summary.successes, 5);
    assert_eq!(summary.errors, 0);

    // Indices consumed: 2, 0, 1, 2, 0 — observable through the names
    // typed into the form by each session.
    let name_prefix = r#"type:input[name="first_name"]:"#;
    let typed: Vec<String> = events_with_prefix(&log, name_prefix)
        .into_iter()
        .map(|e| e[name_prefix.len()..].to_string())
        .collect();
    assert_eq!(typed, vec!["Two T", "Zero Z", "One O", "Two T", "Zero Z"]);

    // Wrap applied after each increment: 2 -> 0 -> 1 -> 2 -> 0 -> 1.
    assert_eq!(summary.final_cursor, 1);
    assert_eq!(PersistentCursor::new(&state_path).load(), 1);

    // One fresh session per iteration, each released.
    assert_eq!(events_with_prefix(&log, "launch").len(), 5);
    assert_eq!(events_with_prefix(&log, "close").len(), 5);
}

#[tokio::test]
async fn missing_form_anchor_errors_but_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("last_index.json");

    let log = new_log();
    let book = AddressBook::from_records(vec![record("Zero", "Z"), record("One", "O")]);
    // Nothing is present: the anchor never appears.
    let factory = MockFactory {
        model: PageModel {
            final_url: "https://shop.example.com/cart".into(),
            ..PageModel::default()
        },
        log: log.clone(),
    };
    let controller = RunController::new(
        book,
        PersistentCursor::new(&state_path),
        factory,
        RunPolicy {
            max_iterations: 3,
            stop_on_inconclusive: false,
        },
    );

    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);
    let summary = controller.run(&pipeline).await.unwrap();

    // Every iteration failed, none halted the controller.
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.successes, 0);

    // Sessions still closed, cursor still advanced exactly once each.
    assert_eq!(events_with_prefix(&log, "close").len(), 3);
    assert_eq!(PersistentCursor::new(&state_path).load(), 1); // (0 + 3) % 2

    // The form was never filled.
    assert!(events_with_prefix(&log, "type:").is_empty());
}

#[tokio::test]
async fn stop_on_inconclusive_halts_after_first_non_success() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("last_index.json");

    let log = new_log();
    let book = AddressBook::from_records(vec![record("Zero", "Z"), record("One", "O")]);
    let factory = MockFactory {
        model: PageModel {
            final_url: "https://shop.example.com/cart".into(),
            ..PageModel::default()
        },
        log: log.clone(),
    };
    let controller = RunController::new(
        book,
        PersistentCursor::new(&state_path),
        factory,
        RunPolicy {
            max_iterations: 10,
            stop_on_inconclusive: true,
        },
    );

    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);
    let summary = controller.run(&pipeline).await.unwrap();

    assert_eq!(summary.iterations, 1);
    // The cursor advanced before the termination decision.
    assert_eq!(PersistentCursor::new(&state_path).load(), 1);
}

#[tokio::test]
async fn classification_follows_the_success_pattern() {
    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);

    let mut matching = MockBackend::new(happy_model(), new_log());
    matching.launch().await.unwrap();
    let result = pipeline.run(&mut matching, &record("Asha", "Verma")).await;
    assert_eq!(result, AttemptResult::Success);

    let mut elsewhere = MockBackend::new(
        PageModel {
            final_url: "https://shop.example.com/cart".into(),
            ..happy_model()
        },
        new_log(),
    );
    elsewhere.launch().await.unwrap();
    let result = pipeline.run(&mut elsewhere, &record("Asha", "Verma")).await;
    assert_eq!(result, AttemptResult::Inconclusive);
}

#[tokio::test]
async fn navigation_timeout_is_fatal_to_the_iteration() {
    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);

    let mut backend = MockBackend::new(
        PageModel {
            navigation_times_out: true,
            ..PageModel::default()
        },
        new_log(),
    );
    backend.launch().await.unwrap();
    let result = pipeline.run(&mut backend, &record("Asha", "Verma")).await;
    assert!(matches!(result, AttemptResult::Error(_)));
}

#[tokio::test]
async fn oversized_persisted_cursor_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("last_index.json");
    // A stale checkpoint from a run against a larger address book.
    PersistentCursor::new(&state_path).save(7);

    let log = new_log();
    let book = AddressBook::from_records(vec![
        record("Zero", "Z"),
        record("One", "O"),
        record("Two", "T"),
    ]);
    let controller = RunController::new(
        book,
        PersistentCursor::new(&state_path),
        MockFactory {
            model: happy_model(),
            log: log.clone(),
        },
        RunPolicy {
            max_iterations: 1,
            stop_on_inconclusive: false,
        },
    );

    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);
    let summary = controller.run(&pipeline).await.unwrap();

    // 7 % 3 = 1: record "One" is consumed, and the persisted value is
    // back inside [0, N).
    let name_prefix = r#"type:input[name="first_name"]:"#;
    let typed = events_with_prefix(&log, name_prefix);
    assert_eq!(typed, vec![format!("{name_prefix}One O")]);
    assert_eq!(summary.final_cursor, 2);
    assert_eq!(PersistentCursor::new(&state_path).load(), 2);
}

#[tokio::test]
async fn empty_address_book_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("last_index.json");

    let controller = RunController::new(
        AddressBook::from_records(Vec::new()),
        PersistentCursor::new(&state_path),
        MockFactory {
            model: PageModel::default(),
            log: new_log(),
        },
        RunPolicy::default(),
    );

    let plan = fast_plan();
    let pipeline = CheckoutPipeline::new(&plan, fast_retry(), None);
    assert!(matches!(
        controller.run(&pipeline).await,
        Err(RunError::EmptyAddressBook)
    ));
}
