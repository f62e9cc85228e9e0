use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use framework::parser::{load_pods, load_request};
use framework::{LlmRequest, Pod, SchedulingContext};
use rand::seq::IndexedRandom;
use scheduler::{Scheduler, SchedulingResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// epp-filter - decision-tree pod filtering for inference requests
#[derive(Parser)]
#[command(name = "epp-filter")]
#[command(about = "Filter model server pods through a configurable decision tree", long_about = None)]
struct Cli {
    /// Path to the scheduler configuration (JSON)
    #[arg(short, long, default_value = "config/scheduler.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every configured plugin and report the scheduling profile
    Validate,

    /// Schedule a single request and show which pods survive
    Evaluate {
        /// Pods file (JSON array)
        #[arg(long, default_value = "config/pods.json")]
        pods: PathBuf,

        /// Target model or LoRA adapter of the request
        #[arg(long, conflicts_with = "request")]
        model: Option<String>,

        /// Request file (JSON), instead of --model
        #[arg(long)]
        request: Option<PathBuf>,
    },

    /// Run many scheduling cycles concurrently and report latencies
    Benchmark {
        /// Pods file (JSON array)
        #[arg(long, default_value = "config/pods.json")]
        pods: PathBuf,

        /// Number of requests to schedule
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Number of requests in flight at once
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let scheduler = Scheduler::load(&cli.config)
        .with_context(|| format!("Failed to load scheduler from {}", cli.config.display()))?;
    println!(
        "{} Loaded {} in {:?}",
        "✓".green(),
        cli.config.display(),
        start.elapsed()
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Validate => handle_validate(&scheduler),
        Commands::Evaluate {
            pods,
            model,
            request,
        } => handle_evaluate(&scheduler, &pods, model, request),
        Commands::Benchmark {
            pods,
            requests,
            concurrent,
        } => handle_benchmark(Arc::new(scheduler), &pods, requests, concurrent).await,
    }
}

/// Handle the 'validate' command
fn handle_validate(scheduler: &Scheduler) -> Result<()> {
    let profile = scheduler.profile();
    let registry = profile.registry();

    println!("{}", "Plugins:".bold().blue());
    for name in registry.names() {
        if let Some(plugin) = registry.get(name) {
            println!("  {} {} ({})", "•".green(), name, plugin.plugin_type());
        }
    }

    println!("{}", "Scheduling profile:".bold().blue());
    let filter = profile.filter().map(|f| f.name().to_string());
    let picker = profile.picker().map(|p| p.name().to_string());
    println!(
        "  {} filter: {}",
        "•".cyan(),
        filter.unwrap_or_else(|| "<none, all pods pass>".to_string())
    );
    println!(
        "  {} picker: {}",
        "•".cyan(),
        picker.unwrap_or_else(|| "<none>".to_string())
    );
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    scheduler: &Scheduler,
    pods_path: &Path,
    model: Option<String>,
    request_path: Option<PathBuf>,
) -> Result<()> {
    let pods = load_pods(pods_path)
        .with_context(|| format!("Failed to load pods from {}", pods_path.display()))?;

    let request = match (model, request_path) {
        (_, Some(path)) => load_request(&path)
            .with_context(|| format!("Failed to load request from {}", path.display()))?,
        (Some(model), None) => LlmRequest::new("cli", model),
        (None, None) => bail!("Either --model or --request is required"),
    };

    let result = scheduler.schedule(&SchedulingContext::new(), &request, &pods)?;
    print_result(&request, &pods, &result);
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    scheduler: Arc<Scheduler>,
    pods_path: &Path,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }
    let pods = Arc::new(
        load_pods(pods_path)
            .with_context(|| format!("Failed to load pods from {}", pods_path.display()))?,
    );

    // Target every adapter loaded somewhere, plus one nobody has
    let mut models: Vec<String> = pods
        .iter()
        .flat_map(|pod| pod.metrics().active_models.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    models.push("base-model".to_string());

    let request_models: Vec<String> = {
        let mut rng = rand::rng();
        (0..requests)
            .filter_map(|_| models.choose(&mut rng).cloned())
            .collect()
    };

    info!(
        "Benchmarking {} requests over {} models ({} concurrent)",
        requests,
        models.len(),
        concurrent
    );

    // Use a semaphore to bound in-flight requests
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_clock = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for (i, model) in request_models.into_iter().enumerate() {
        let permit = permits.clone().acquire_owned().await?;
        let scheduler = scheduler.clone();
        let pods = pods.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let request = LlmRequest::new(format!("bench-{i}"), model);
            let start = Instant::now();
            scheduler.schedule(&SchedulingContext::new(), &request, &pods)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    // Wait for all tasks to complete and collect timings
    let mut timings: Vec<Duration> = Vec::with_capacity(handles.len());
    for handle in handles {
        timings.push(handle.await.context("Scheduling task panicked")??);
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let percentile = |p: f64| {
        let index = ((timings.len() as f64 * p) as usize).min(timings.len() - 1);
        timings[index]
    };
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", timings.len(), concurrent);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        timings.len() as f64 / total_time.as_secs_f64()
    );
    Ok(())
}

/// Print which pods survived and which one was picked
fn print_result(request: &LlmRequest, pods: &[Pod], result: &SchedulingResult) {
    println!(
        "{}",
        format!("Request {} for model '{}':", request.request_id, request.target_model)
            .bold()
            .blue()
    );
    for pod in pods {
        let metrics = pod.metrics();
        let kept = result.candidates.contains(pod);
        let marker = if kept { "✓".green() } else { "✗".red() };
        println!(
            "  {} {} [queue {}, kv-cache {:.0}%, adapters {}/{}]",
            marker,
            pod,
            metrics.waiting_queue_size,
            metrics.kv_cache_usage_percent * 100.0,
            metrics.active_models.len(),
            metrics.max_active_models
        );
    }

    match &result.target {
        Some(target) => println!("{} {}", "Target:".bold(), target.to_string().green()),
        None => println!("{}", "No pod can serve this request".yellow()),
    }
}
