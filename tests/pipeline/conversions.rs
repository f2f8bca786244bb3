use pipekit::{
    to_async, to_sync, AsyncPipeline, AsyncStep, BoxError, Execute, ExecuteAsync, Pipeline,
    PipelineError, Recovery, Step,
};
use std::time::Duration;

fn sample() -> Pipeline<i32> {
    let mut pipeline: Pipeline<i32> = Pipeline::new(vec![
        Step::map("add3", |x| x + 3),
        Step::new("guard", |x, _| {
            if x % 2 == 0 {
                Err(BoxError::from("even"))
            } else {
                Ok(x)
            }
        }),
        Step::map("double", |x| x * 2),
    ]);
    pipeline
        .before(|x, _| Ok(x + 1))
        .on_error(|_, ctx| {
            if ctx.input > 100 {
                Recovery::Decline
            } else {
                Recovery::Recover(-ctx.input)
            }
        });
    pipeline
}

#[tokio::test]
async fn to_async_resolves_to_sync_result() {
    let sync = sample();
    let lifted = to_async(sample());
    for x in [0, 1, 2, 7] {
        assert_eq!(
            lifted.invoke(x, ()).await.unwrap(),
            sync.invoke(x, &()).unwrap()
        );
    }
}

#[test]
fn round_trip_behaves_like_original() {
    let original = sample();
    let round_trip = to_sync(to_async(sample()));
    for x in [0, 1, 2, 7, 150, 199] {
        let expected = original.invoke(x, &());
        let actual = round_trip.invoke(x, &());
        match (expected, actual) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("diverged for {x}: {a:?} vs {b:?}"),
        }
    }
}

#[test]
fn to_sync_runs_async_pipeline_that_never_suspends() {
    let mut pipeline: AsyncPipeline<i32> = AsyncPipeline::new(vec![
        AsyncStep::map("inc", |x| x + 1),
        AsyncStep::from_sync(Step::map("double", |x| x * 2)),
    ]);
    pipeline.after(|x, _| async move { Ok::<_, BoxError>(x + 10) });

    let sync = to_sync(pipeline);
    assert_eq!(sync.invoke(1, &()).unwrap(), 34);
}

#[tokio::test]
async fn to_sync_reports_pending_result_for_suspending_steps() {
    let pipeline: AsyncPipeline<i32> = AsyncPipeline::new(vec![AsyncStep::new(
        "sleepy",
        |x, _| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, BoxError>(x)
        },
    )]);

    let err = to_sync(pipeline).invoke(1, &()).unwrap_err();
    assert!(matches!(err, PipelineError::PendingResult));
}

#[tokio::test]
async fn blocking_step_reports_unexpected_async_result() {
    let sleepy: AsyncStep<i32> = AsyncStep::new("sleepy", |x, _| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, BoxError>(x)
    });
    let mut pipeline = Pipeline::new(vec![Step::blocking_from_async(sleepy)]);

    let err = pipeline.invoke(1, &()).unwrap_err();
    let cause = err.cause().and_then(|c| c.downcast_ref::<PipelineError>());
    assert!(matches!(
        cause,
        Some(PipelineError::UnexpectedAsyncResult { step }) if step == "sleepy"
    ));

    // raised as a step failure, so error hooks can still recover it
    pipeline.on_error(|_, _| Recovery::Recover(0));
    assert_eq!(pipeline.invoke(1, &()).unwrap(), 0);
}

#[tokio::test]
async fn executors_are_usable_as_trait_objects() {
    let executors: Vec<Box<dyn ExecuteAsync<i32, ()>>> = vec![
        Box::new(to_async(sample())),
        Box::new(AsyncPipeline::new(vec![AsyncStep::map("inc", |x| x + 1)])),
    ];
    let mut results = Vec::new();
    for executor in &executors {
        results.push(executor.invoke(1, ()).await.unwrap());
    }
    assert_eq!(results, vec![-10, 2]);

    let sync: Box<dyn Execute<i32, ()>> = Box::new(to_sync(to_async(sample())));
    assert_eq!(sync.invoke(1, &()).unwrap(), -10);
}

#[test]
fn to_async_completes_on_first_poll() {
    let lifted = to_async(sample());
    let mut task = tokio_test::task::spawn(lifted.invoke(2, ()));
    let out = tokio_test::assert_ready!(task.poll());
    assert_eq!(out.unwrap(), sample().invoke(2, &()).unwrap());

    assert_eq!(tokio_test::block_on(lifted.invoke(4, ())).unwrap(), 20);
}
