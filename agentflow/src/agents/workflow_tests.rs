//! End-to-end tests of the default workflow with offline collaborators.

use super::*;
use crate::collaborators::{LanguageModel, MockWeatherService, ScriptedModel};
use crate::context::{keys, Context};
use crate::core::{PipelineStatus, StageErrorKind};
use crate::events::CollectingEventSink;
use crate::testing::{assert_completed, assert_failed_at};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

fn scripted_model() -> Arc<dyn LanguageModel> {
    Arc::new(
        ScriptedModel::new()
            .when(r"Extract the city name(?s:.*)\b([A-Z][a-z]+) is\b", "$1")
            .unwrap()
            .when(r"Decide whether", "exit_loop")
            .unwrap()
            .when(r"one polite sentence", "It is sunny in Paris at 10:30 AM.")
            .unwrap(),
    )
}

fn pipeline(config: &AgentConfig) -> Pipeline {
    default_workflow(&Collaborators::offline(scripted_model()), config).unwrap()
}

#[tokio::test]
async fn test_city_weather_time_example() {
    let collaborators = Collaborators::offline(scripted_model());
    let pipeline = PipelineBuilder::new("lookup")
        .stage(Arc::new(CityExtractorAgent::new(collaborators.model.clone())))
        .unwrap()
        .stage(Arc::new(WeatherFetcherAgent::new(collaborators.weather.clone())))
        .unwrap()
        .stage(Arc::new(TimeFetcherAgent::new(collaborators.clock.clone())))
        .unwrap()
        .build()
        .unwrap();

    let run = pipeline.run(Context::from_input_text("Paris is sunny today.")).await;

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(
        run.context.to_json(),
        json!({
            "input_text": "Paris is sunny today.",
            "city": "Paris",
            "weather": "Sunny",
            "time": "10:30 AM",
        })
    );
}

#[tokio::test]
async fn test_default_workflow_stage_order() {
    let pipeline = pipeline(&AgentConfig::default());

    assert_eq!(
        pipeline.stage_names(),
        vec![
            QUIZ_GENERATOR,
            CITY_EXTRACTOR,
            WEATHER_FETCHER,
            TIME_FETCHER,
            RESEARCH_LOOP,
            PDF_READER,
            RESPONSE_AGENT,
        ]
    );
    assert_eq!(pipeline.name(), "my_agent");
}

#[tokio::test]
async fn test_full_run_writes_every_owned_key() {
    let pipeline = pipeline(&AgentConfig::default());

    let run = pipeline.run(Context::from_input_text("Paris is sunny today.")).await;

    assert_completed(&run);
    let mut expected: Vec<String> = pipeline.owned_keys().iter().cloned().collect();
    expected.push(keys::INPUT_TEXT.to_string());
    expected.retain(|k| k != keys::PDF_TEXT && k != keys::SEARCH_QUERY);
    expected.sort();
    assert_eq!(run.context.keys().map(String::from).collect::<Vec<_>>(), expected);
    assert_eq!(
        run.context.get_str(keys::FINAL_RESPONSE),
        Some("It is sunny in Paris at 10:30 AM.")
    );
    assert!(!run.context.contains_key(keys::SEARCH_QUERY));
}

#[tokio::test]
async fn test_attached_document_is_read() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", "x".repeat(64)).unwrap();
    let config = AgentConfig::default().with_pdf_char_limit(16);
    let mut context = Context::from_input_text("Paris is sunny today.");
    context
        .seed(keys::PDF_PATH, json!(file.path().to_string_lossy()))
        .unwrap();

    let run = pipeline(&config).run(context).await;

    assert_completed(&run);
    assert_eq!(run.context.get_str(keys::PDF_TEXT), Some("x".repeat(16).as_str()));
}

#[tokio::test]
async fn test_weather_outage_stops_workflow() {
    let mut weather = MockWeatherService::new();
    weather
        .expect_current_weather()
        .returning(|_| Err(anyhow::anyhow!("network unreachable")));
    let collaborators = Collaborators::offline(scripted_model()).with_weather(Arc::new(weather));
    let pipeline = default_workflow(&collaborators, &AgentConfig::default()).unwrap();

    let run = pipeline.run(Context::from_input_text("Paris is sunny today.")).await;

    assert_failed_at(&run, WEATHER_FETCHER, StageErrorKind::Collaborator);
    assert!(run.failure().unwrap().cause.contains("network unreachable"));
    assert!(!run.context.contains_key(keys::TIME));
    assert!(!run.context.contains_key(keys::FINAL_RESPONSE));
}

#[tokio::test]
async fn test_unsatisfied_research_runs_configured_rounds() {
    let model = Arc::new(
        ScriptedModel::new()
            .when(r"Extract the city name", "Paris")
            .unwrap()
            .when(r"one polite sentence", "Done.")
            .unwrap()
            .otherwise("paris weather forecast"),
    );
    let sink = Arc::new(CollectingEventSink::new());
    let config = AgentConfig::default().with_max_iterations(2);
    let pipeline = workflow_builder(&Collaborators::offline(model), &config)
        .unwrap()
        .with_event_sink(sink.clone())
        .build()
        .unwrap();

    let run = pipeline.run(Context::from_input_text("Paris is sunny today.")).await;

    assert_completed(&run);
    assert_eq!(sink.events_of_type("loop.iteration").len(), 2);
    assert_eq!(sink.events_of_type("loop.exhausted").len(), 1);
    assert_eq!(
        run.context.get_str(keys::SEARCH_QUERY),
        Some("paris weather forecast")
    );
}

#[tokio::test]
async fn test_reruns_are_byte_identical() {
    let first = pipeline(&AgentConfig::default())
        .run(Context::from_input_text("Paris is sunny today."))
        .await;
    let second = pipeline(&AgentConfig::default())
        .run(Context::from_input_text("Paris is sunny today."))
        .await;

    assert_eq!(
        serde_json::to_vec(&first.context).unwrap(),
        serde_json::to_vec(&second.context).unwrap()
    );
    assert_eq!(first.context.fingerprint(), second.context.fingerprint());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AgentConfig::default().with_quiz_questions(0);
    let err = default_workflow(&Collaborators::offline(scripted_model()), &config).unwrap_err();

    assert!(err.to_string().contains("quiz_questions"));
}
