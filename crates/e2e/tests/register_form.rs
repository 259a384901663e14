use std::time::Duration;

use imgreg_e2e::config::RunnerConfig;
use imgreg_e2e::expect::{stored_collection, Expect, ExpectConfig};
use imgreg_e2e::register_form::{self, elements, ERROR_COLOR, INVALID_URL_MESSAGE, TITLE_REQUIRED_MESSAGE};
use imgreg_e2e::runner::StepStatus;
use imgreg_e2e::sim::{Faults, SimulatedPage};
use imgreg_e2e::{suite, BrowserDriver, E2eError, RegisteredImage, TestRunner};
use test_case::test_case;

const TITLE: &str = "Alien BR";
const IMAGE_URL: &str = "https://cdn.mos.cms.futurecdn.net/eM9EvWyDxXcnQTTyH8c8p5-1200-80.jpg";

fn fast_expect() -> ExpectConfig {
    ExpectConfig {
        timeout_ms: 100,
        poll_interval_ms: 10,
    }
}

fn fast_runner() -> TestRunner {
    TestRunner::with_config(RunnerConfig {
        settle_ms: 0,
        expect: fast_expect(),
        ..Default::default()
    })
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Click,
    Enter,
}

async fn submit(page: &SimulatedPage, trigger: Trigger) {
    match trigger {
        Trigger::Click => register_form::click_submit_button(page, Duration::ZERO).await.unwrap(),
        Trigger::Enter => register_form::hit_enter(page, Duration::ZERO).await.unwrap(),
    }
}

/// Submitting with both fields empty shows both messages, paints the URL
/// feedback border red and stores nothing.
#[tokio::test]
async fn empty_submission_is_rejected() {
    let page = SimulatedPage::new();
    page.visit("/").await.unwrap();

    register_form::type_title(&page, "").await.unwrap();
    register_form::type_image_url(&page, "").await.unwrap();
    register_form::click_submit_button(&page, Duration::ZERO).await.unwrap();

    let expect = Expect::new(&page, fast_expect());
    expect
        .contains_text(elements::title_feedback(), TITLE_REQUIRED_MESSAGE)
        .await
        .unwrap();
    expect
        .contains_text(elements::image_url_feedback(), INVALID_URL_MESSAGE)
        .await
        .unwrap();
    expect
        .css_equals(elements::image_url_feedback(), "border-right-color", ERROR_COLOR)
        .await
        .unwrap();
    expect.stored_len_equals(0).await.unwrap();
}

/// Enter and click are interchangeable ways to submit.
#[test_case(Trigger::Click ; "click")]
#[test_case(Trigger::Enter ; "enter")]
#[tokio::test]
async fn valid_submission_appends_and_clears(trigger: Trigger) {
    let page = SimulatedPage::new();
    page.visit("/").await.unwrap();

    register_form::type_title(&page, TITLE).await.unwrap();
    register_form::type_image_url(&page, IMAGE_URL).await.unwrap();
    submit(&page, trigger).await;

    let expect = Expect::new(&page, fast_expect());
    expect
        .last_attribute_equals(elements::card_images(), "src", IMAGE_URL)
        .await
        .unwrap();
    expect
        .last_stored_equals(&RegisteredImage::new(TITLE, IMAGE_URL))
        .await
        .unwrap();
    expect.stored_len_equals(1).await.unwrap();
    expect.has_value(elements::title_input(), "").await.unwrap();
    expect.has_value(elements::image_url_input(), "").await.unwrap();
}

#[tokio::test]
async fn stored_collection_survives_reload() {
    let page = SimulatedPage::new();
    page.visit("/").await.unwrap();
    register_form::type_title(&page, TITLE).await.unwrap();
    register_form::type_image_url(&page, IMAGE_URL).await.unwrap();
    register_form::click_submit_button(&page, Duration::ZERO).await.unwrap();

    let before = stored_collection(&page).await.unwrap();
    page.reload().await.unwrap();

    let expect = Expect::new(&page, fast_expect());
    expect.storage_equals(&before).await.unwrap();
    expect
        .last_attribute_equals(elements::card_images(), "src", IMAGE_URL)
        .await
        .unwrap();
}

#[tokio::test]
async fn assertion_gives_up_after_timeout() {
    let page = SimulatedPage::new();
    page.visit("/").await.unwrap();

    let err = Expect::new(&page, fast_expect())
        .contains_text(elements::title_feedback(), TITLE_REQUIRED_MESSAGE)
        .await
        .unwrap_err();

    match err {
        E2eError::AssertionFailed(msg) => assert!(msg.contains("gave up after 100 ms"), "{}", msg),
        other => panic!("expected assertion failure, got {}", other),
    }
}

#[tokio::test]
async fn builtin_suite_passes_against_simulated_page() {
    let page = SimulatedPage::new();
    let runner = fast_runner();

    let scenarios = suite::builtin().unwrap();
    let results = runner.run_scenarios(&page, &scenarios).await;

    for result in &results.results {
        assert!(result.success, "{} failed: {:?}", result.name, result.error);
        assert!(result.steps.iter().all(|s| s.status == StepStatus::Passed));
    }
    assert_eq!(results.total, 4);
    assert!(results.success());

    // Every scenario clears up after itself.
    assert!(page.local_storage().await.unwrap().is_empty());
}

#[tokio::test]
async fn first_failure_skips_remaining_steps() {
    let page = SimulatedPage::with_faults(Faults {
        keep_inputs_after_submit: true,
        ..Default::default()
    });
    let runner = fast_runner();

    let scenarios = suite::builtin().unwrap();
    let enter = scenarios.iter().find(|s| s.name == "valid-inputs-enter").unwrap();
    let result = runner.run_scenario(&page, enter).await;

    assert!(!result.success);
    let failed = result.step("Then The inputs should be cleared").unwrap();
    assert_eq!(failed.status, StepStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("#title has value ''"));
    assert!(result.error.as_deref().unwrap().starts_with("Step failed: Then The inputs should be cleared"));
}

#[tokio::test]
async fn lost_storage_on_reload_is_reported() {
    let page = SimulatedPage::with_faults(Faults {
        forget_storage_on_reload: true,
        ..Default::default()
    });
    let runner = fast_runner();

    let scenarios = suite::builtin().unwrap();
    let reload = scenarios.iter().find(|s| s.name == "reload-durability").unwrap();
    let result = runner.run_scenario(&page, reload).await;

    assert!(!result.success);
    let statuses: Vec<_> = result.steps.iter().map(|s| s.status).collect();
    let failed_at = statuses.iter().position(|s| *s == StepStatus::Failed).unwrap();
    assert_eq!(result.steps[failed_at].name, "Then the stored images should be unchanged");
    assert!(statuses[failed_at + 1..].iter().all(|s| *s == StepStatus::Skipped));
}

#[tokio::test]
async fn rendered_but_unpersisted_image_fails_storage_step() {
    let page = SimulatedPage::with_faults(Faults {
        skip_persistence: true,
        ..Default::default()
    });
    let runner = fast_runner();

    let scenarios = suite::builtin().unwrap();
    let click = scenarios.iter().find(|s| s.name == "valid-inputs-click").unwrap();
    let result = runner.run_scenario(&page, click).await;

    assert_eq!(
        result.step("And the list of registered images should be updated with the new item").unwrap().status,
        StepStatus::Passed
    );
    assert_eq!(
        result.step("And the new item should be stored in the localStorage").unwrap().status,
        StepStatus::Failed
    );
}

#[tokio::test]
async fn failed_storage_clear_fails_the_scenario() {
    let page = SimulatedPage::with_faults(Faults {
        refuse_storage_clear: true,
        ..Default::default()
    });
    let runner = fast_runner();

    let scenarios = suite::builtin().unwrap();
    let click = scenarios.iter().find(|s| s.name == "valid-inputs-click").unwrap();
    let result = runner.run_scenario(&page, click).await;

    assert!(result.steps.iter().all(|s| s.status == StepStatus::Passed));
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().starts_with("after hook:"));
}

#[tokio::test]
async fn name_within_tag_selects_one_scenario() {
    let runner = fast_runner();
    let page = SimulatedPage::new();

    let results = runner
        .run_selected(&page, Some("submit"), Some("valid-inputs-enter"))
        .await
        .unwrap();
    assert_eq!(results.total, 1);
    assert_eq!(results.results[0].name, "valid-inputs-enter");

    assert!(runner
        .run_selected(&page, Some("validation"), Some("valid-inputs-enter"))
        .await
        .is_err());
}

#[tokio::test]
async fn copy_paste_step_is_flagged_not_failed() {
    let yaml = r#"
name: mislabelled
steps:
  - name: Given I am on the image registration page
    action: visit
  - name: Then I enter "" in the URL field
    action: type_title
    text: ""
"#;
    let scenario = imgreg_e2e::Scenario::from_yaml(yaml).unwrap();
    let result = fast_runner().run_scenario(&SimulatedPage::new(), &scenario).await;

    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
}

#[tokio::test]
async fn results_are_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let runner = TestRunner::with_config(RunnerConfig {
        settle_ms: 0,
        expect: fast_expect(),
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    });

    let results = runner.run_named(&SimulatedPage::new(), "invalid-inputs").await.unwrap();
    let path = runner.write_results(&results).unwrap();

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["total"], 1);
    assert_eq!(written["passed"], 1);
    assert_eq!(written["results"][0]["steps"][0]["status"], "passed");
}
