use pipekit::config::{Config, ConfigError};
use pipekit::{
    to_sync, AsyncStep, BoxError, Execute, HookKind, PipelineError, Recovery, Registry, Step,
};
use std::io::Write;
use std::time::Duration;

const CONFIG: &str = r#"
    [logging]
    log_level = "warn"

    [loader]
    timeout_ms = 1500
    user_agent = "pipekit-tests"

    [pipelines.normalize]
    description = "Trim then shout"
    steps = ["trim", "upper"]
    after = ["exclaim"]

    [pipelines.resilient]
    steps = ["parse", "upper"]
    error = ["fallback"]

    [pipelines.fetching]
    steps = ["trim", "lookup"]
    loading = ["mark"]
"#;

fn registry() -> Registry<String> {
    Registry::<String>::new()
        .with_step("trim", Step::map("trim", |s: String| s.trim().to_string()))
        .with_step("upper", Step::map("upper", |s: String| s.to_uppercase()))
        .with_step(
            "parse",
            Step::new("parse", |s: String, _: &()| {
                s.parse::<u32>()
                    .map(|n| n.to_string())
                    .map_err(BoxError::from)
            }),
        )
        .with_async_step(
            "lookup",
            AsyncStep::loading("lookup", |s: String, _: ()| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<_, BoxError>(format!("found:{s}"))
            }),
        )
        .with_hook("exclaim", |s: String, _| Ok(format!("{s}!")))
        .with_hook("mark", |s: String, ctx| {
            Ok(if ctx.is_loading { format!("[{s}]") } else { s })
        })
        .with_error_hook("fallback", |_, ctx| Recovery::Recover(format!("raw:{}", ctx.input)))
}

fn write_config(content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

#[test]
fn loads_config_from_file() -> anyhow::Result<()> {
    let file = write_config(CONFIG)?;
    let config = Config::from_path(file.path())?;

    assert_eq!(config.logging.log_level, "warn");
    assert_eq!(config.loader.timeout_ms, 1500);
    assert_eq!(config.loader.user_agent, "pipekit-tests");
    assert_eq!(config.pipelines.len(), 3);
    Ok(())
}

#[test]
fn missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn configured_sync_pipeline_runs() -> anyhow::Result<()> {
    let config = Config::from_toml_str(CONFIG)?;
    let registry = registry();

    let normalize = config.pipeline("normalize").unwrap().build(&registry)?;
    assert_eq!(normalize.hook_count(HookKind::After), 1);
    // the after hook runs once per step
    assert_eq!(normalize.invoke("  hi ".to_string(), &())?, "HI!!");

    let resilient = config.pipeline("resilient").unwrap().build(&registry)?;
    assert_eq!(resilient.invoke("12".to_string(), &())?, "12");
    assert_eq!(resilient.invoke("abc".to_string(), &())?, "RAW:ABC");
    Ok(())
}

#[tokio::test]
async fn configured_async_pipeline_runs_loading_hooks() -> anyhow::Result<()> {
    let config = Config::from_toml_str(CONFIG)?;
    let registry = registry();
    let fetching = config.pipeline("fetching").unwrap();

    assert!(matches!(
        fetching.build(&registry),
        Err(PipelineError::InvalidHook { kind: HookKind::Loading, .. })
    ));

    let pipeline = fetching.build_async(&registry)?;
    assert_eq!(pipeline.invoke(" id ".to_string(), ()).await?, "found:[id]");

    // the lookup step suspends, so it cannot be driven synchronously
    let err = to_sync(pipeline).invoke("id".to_string(), &()).unwrap_err();
    assert!(matches!(err, PipelineError::PendingResult));
    Ok(())
}
