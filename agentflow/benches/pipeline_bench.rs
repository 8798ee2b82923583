//! Benchmarks for pipeline execution.

use agentflow::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn offline_model() -> Arc<dyn LanguageModel> {
    Arc::new(
        ScriptedModel::new()
            .when(r"Extract the city name", "Paris")
            .unwrap()
            .otherwise("It is sunny in Paris."),
    )
}

fn pipeline_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let collaborators = Collaborators::offline(offline_model());
    let pipeline = default_workflow(&collaborators, &AgentConfig::default()).unwrap();

    c.bench_function("default_workflow", |b| {
        b.iter(|| {
            let run = rt.block_on(pipeline.run(Context::from_input_text(
                "Paris is sunny today. The museums open at nine.",
            )));
            black_box(run.context.fingerprint())
        })
    });

    c.bench_function("context_fingerprint", |b| {
        let run = rt.block_on(pipeline.run(Context::from_input_text("Paris is sunny today.")));
        b.iter(|| black_box(run.context.fingerprint()))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
