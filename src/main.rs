//! Fezz Context - example invocation runner
//!
//! Runs a few sample functions once each and prints where their logs went.
//! Configure with `FEZZ_LOG_DIR`, `FEZZ_ENV`, `FEZZ_LOGGING` and
//! `FEZZ_CAPTURE_NATIVE`.

use fezz_context::prelude::*;
use tracing_subscriber::EnvFilter;

/// Greets the caller, logging through both the context and stdout.
#[context_function(id = "hello", description = "Greets the caller")]
async fn hello(ctx: &mut Context) -> Result<ResponseOutput, FunctionError> {
    let name = ctx
        .req
        .query
        .get("name")
        .cloned()
        .unwrap_or_else(|| "World".to_string());

    ctx.log(format!("Greeting {}", name));
    ctx.log(serde_json::json!({ "path": ctx.req.path, "method": ctx.req.method }));
    println!("Hello from println!, {}", name);

    Ok(ctx.res.json(
        &serde_json::json!({ "message": format!("Hello, {}!", name) }),
        ResponseOptions::new(),
    ))
}

/// Echo function - echoes back the request body.
#[context_function(id = "echo")]
async fn echo(ctx: &mut Context) -> Result<ResponseOutput, FunctionError> {
    let body = ctx.req.body_text();
    eprintln!("echoing {} bytes", body.len());
    Ok(ctx.res.text(body, ResponseOptions::new()))
}

/// Always fails; the error lands on the invocation's error stream.
#[context_function(id = "broken")]
async fn broken(ctx: &mut Context) -> Result<ResponseOutput, FunctionError> {
    ctx.error(Log::new("about to fail"));
    Err(FunctionError::with_code(503, "dependency unavailable"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ContextConfig::from_env();
    std::fs::create_dir_all(&config.log_dir)?;
    tracing::info!("Writing invocation logs to {}", config.log_dir.display());

    let invoker = Invoker::with_file_store(config);

    let runs: Vec<(Box<dyn ContextFunction>, ContextRequest)> = vec![
        (
            Box::new(HelloFunction::new()),
            ContextRequest::new("GET", "http://localhost:8080/hello?name=Fezz"),
        ),
        (
            Box::new(EchoFunction::new()),
            ContextRequest::new("POST", "http://localhost:8080/echo").body("ping"),
        ),
        (
            Box::new(BrokenFunction::new()),
            ContextRequest::new("GET", "http://localhost:8080/broken"),
        ),
    ];

    for (function, request) in runs {
        let outcome = invoker.invoke(function.as_ref(), request, None).await?;
        tracing::info!(
            "{} -> {} {:?} (logs: {})",
            function.name(),
            outcome.response.status_code,
            outcome.response.text_body(),
            outcome.invocation_id
        );
    }

    tracing::info!("hello: {}", HelloFunction::DESCRIPTION);
    Ok(())
}
