use pipekit::{
    BoxError, ErrorContext, HookKind, Pipeline, PipelineError, Recovery, Registry, SharedError,
    Step,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

fn boom() -> Step<i32> {
    Step::new("boom", |_, _| Err(Box::new(Boom) as BoxError))
}

#[test]
fn steps_compose_left_to_right() {
    let pipeline: Pipeline<i32> = Pipeline::new(vec![
        Step::map("add3", |x| x + 3),
        Step::map("double", |x| x * 2),
        Step::map("dec", |x| x - 1),
    ]);
    for x in [-4, 0, 1, 17] {
        assert_eq!(pipeline.invoke(x, &()).unwrap(), (x + 3) * 2 - 1);
    }
    assert_eq!(
        pipeline.step_names().collect::<Vec<_>>(),
        vec!["add3", "double", "dec"]
    );
}

#[test]
fn before_hook_feeds_the_step() {
    let mut pipeline: Pipeline<i32> = Pipeline::new(vec![Step::map("square", |x| x * x)]);
    pipeline.before(|x, _| Ok(x + 1));
    assert_eq!(pipeline.invoke(3, &()).unwrap(), 16);
}

#[test]
fn after_hook_sees_step_output() {
    let mut pipeline: Pipeline<i32> = Pipeline::new(vec![Step::map("square", |x| x * x)]);
    pipeline.after(|x, _| Ok(x + 1));
    assert_eq!(pipeline.invoke(3, &()).unwrap(), 10);
}

#[test]
fn failure_stops_later_steps_and_keeps_cause() {
    let third_ran = Arc::new(AtomicBool::new(false));
    let flag = third_ran.clone();
    let pipeline: Pipeline<i32> = Pipeline::new(vec![
        Step::map("identity", |x| x),
        boom(),
        Step::map("times100", move |x| {
            flag.store(true, Ordering::SeqCst);
            x * 100
        }),
    ]);

    let err = pipeline.invoke(5, &()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StepExecution { index: 1, total: 3, ref step, .. } if step == "boom"
    ));
    assert!(err.cause().and_then(|c| c.downcast_ref::<Boom>()).is_some());
    assert!(!third_ran.load(Ordering::SeqCst));
}

#[test]
fn error_hook_value_continues_pipeline() {
    let mut pipeline: Pipeline<i32> =
        Pipeline::new(vec![boom(), Step::map("inc", |x| x + 1)]);
    pipeline.on_error(|_, _| Recovery::Recover(42));
    assert_eq!(pipeline.invoke(0, &()).unwrap(), 43);
}

#[test]
fn first_recovering_error_hook_wins() {
    let mut pipeline: Pipeline<i32> =
        Pipeline::new(vec![boom(), Step::map("inc", |x| x + 1)]);
    pipeline
        .on_error(|_, _| Recovery::Decline)
        .on_error(|_, _| Recovery::Recover(10))
        .on_error(|_, _| Recovery::Recover(99));
    assert_eq!(pipeline.invoke(0, &()).unwrap(), 11);
}

#[test]
fn all_declining_error_hooks_propagate_failure() {
    let mut pipeline: Pipeline<i32> = Pipeline::new(vec![boom()]);
    pipeline
        .on_error(|_, _| Recovery::Decline)
        .on_error(|error: &SharedError, _: &ErrorContext<i32>| {
            if error.is::<Boom>() {
                Recovery::Decline
            } else {
                Recovery::Recover(0)
            }
        });

    let err = pipeline.invoke(1, &()).unwrap_err();
    assert_eq!(err.to_string(), "Step 0 of 1 ('boom') failed in step: boom");
}

#[test]
fn empty_like_value_is_a_valid_recovery() {
    let mut pipeline: Pipeline<Option<i32>> = Pipeline::new(vec![Step::new("parse", |_, _| {
        Err(BoxError::from("unparseable"))
    })]);
    pipeline.on_error(|_, _| Recovery::Recover(None));
    assert_eq!(pipeline.invoke(Some(1), &()).unwrap(), None);
}

#[test]
fn hooks_run_in_registration_order() {
    let mut pipeline: Pipeline<String> = Pipeline::new(vec![Step::map("id", |s| s)]);
    pipeline
        .before(|s, _| Ok(format!("h1({s})")))
        .before(|s, _| Ok(format!("h2({s})")));
    assert_eq!(pipeline.invoke("x".to_string(), &()).unwrap(), "h2(h1(x))");
}

#[test]
fn unknown_hook_names_are_rejected() {
    let registry = Registry::<i32>::new().with_hook("known", |x, _| Ok(x));
    let mut pipeline: Pipeline<i32> = Pipeline::default();

    for kind in [HookKind::Before, HookKind::After, HookKind::Error] {
        let err = pipeline.register(kind, "42", &registry).err().unwrap();
        assert!(matches!(err, PipelineError::InvalidHook { kind: k, .. } if k == kind));
    }
    assert_eq!(pipeline.hook_count(HookKind::Before), 0);
    assert_eq!(
        PipelineError::InvalidHook {
            kind: HookKind::After,
            name: "42".to_string()
        }
        .to_string(),
        "No after hook named '42' is available"
    );
}

#[test]
fn unresolved_step_bypasses_error_hooks() {
    let mut pipeline: Pipeline<i32> =
        Pipeline::new(vec![Step::map("inc", |x| x + 1), Step::unresolved("ghost")]);
    pipeline.on_error(|_, _| Recovery::Recover(0));

    let err = pipeline.invoke(1, &()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidStep { index: 1, ref name } if name == "ghost"));
}

#[test]
fn error_hook_receives_value_entering_failed_stage() {
    let mut pipeline: Pipeline<i32> = Pipeline::new(vec![
        Step::map("double", |x| x * 2),
        Step::new("check", |x, _| {
            if x > 10 {
                Err(BoxError::from("over limit"))
            } else {
                Ok(x)
            }
        }),
    ]);
    pipeline.on_error(|_, ctx: &ErrorContext<i32>| Recovery::Recover(ctx.input / 2));

    assert_eq!(pipeline.invoke(4, &()).unwrap(), 8);
    assert_eq!(pipeline.invoke(7, &()).unwrap(), 7);
}
