use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use trolley_engine::addresses::AddressBook;
use trolley_engine::backend::Backend;
use trolley_engine::config::{ConfigLoader, TrolleyConfig};
use trolley_engine::cursor::PersistentCursor;
use trolley_engine::diagnostics;
use trolley_engine::flow::CheckoutPipeline;
use trolley_engine::protocol::ReadinessPolicy;
use trolley_engine::runner::RunController;
use trolley_h::backend::{HeadlessBackend, HeadlessFactory};

#[derive(Parser)]
#[command(name = "trolley", version, about = "Resilient storefront checkout-flow runner")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./trolley.yaml, then ~/.trolley/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch the browser visibly instead of headless
    #[arg(long)]
    visible: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the checkout flow across the address book
    Run {
        /// Override the configured iteration cap
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Stop at the first non-success classification
        #[arg(long)]
        stop_on_inconclusive: bool,
    },
    /// Open a page and dump its form structure
    Inspect {
        /// Page to inspect (defaults to the first product URL)
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout stays usable for reports
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };

    match args.command {
        Command::Run {
            max_iterations,
            stop_on_inconclusive,
        } => run(config, args.visible, max_iterations, stop_on_inconclusive).await,
        Command::Inspect { url } => inspect(config, args.visible, url).await,
    }
}

async fn run(
    config: TrolleyConfig,
    visible: bool,
    max_iterations: Option<u64>,
    stop_on_inconclusive: bool,
) -> anyhow::Result<()> {
    let addresses = AddressBook::load(&config.addresses_path)?;
    let cursor = PersistentCursor::from_config(&config.state_path);
    tracing::info!(
        checkpoint = %cursor.path().display(),
        "Starting run-cycle"
    );

    let mut policy = config.policy;
    if let Some(cap) = max_iterations {
        policy.max_iterations = cap;
    }
    if stop_on_inconclusive {
        policy.stop_on_inconclusive = true;
    }

    let pipeline = CheckoutPipeline::new(&config.plan, config.retry, config.snapshot_dir.clone());
    let controller = RunController::new(addresses, cursor, HeadlessFactory::new(visible), policy);
    let summary = controller.run(&pipeline).await?;

    println!(
        "{} iterations: {} success, {} inconclusive, {} error (next index: {})",
        summary.iterations,
        summary.successes,
        summary.inconclusive,
        summary.errors,
        summary.final_cursor
    );
    Ok(())
}

async fn inspect(config: TrolleyConfig, visible: bool, url: Option<String>) -> anyhow::Result<()> {
    let target = match url.or_else(|| config.plan.product_urls.first().cloned()) {
        Some(target) => target,
        None => anyhow::bail!("No URL given and no product URLs configured"),
    };

    let mut backend = HeadlessBackend::new_with_visibility(visible);
    if let Err(e) = backend.launch().await {
        eprintln!("Failed to launch backend: {}", e);
        return Err(e.into());
    }

    let result = dump_page(&mut backend, &config, &target).await;
    backend.close().await?;
    result
}

async fn dump_page(
    backend: &mut HeadlessBackend,
    config: &TrolleyConfig,
    target: &str,
) -> anyhow::Result<()> {
    let timeout = Duration::from_millis(config.plan.navigation_timeout_ms);
    backend
        .navigate(target, ReadinessPolicy::NetworkIdle, timeout)
        .await?;

    let structure = diagnostics::page_structure(backend).await?;
    println!(
        "{} forms, {} inputs, {} iframes on {}",
        structure.forms.len(),
        structure.inputs.len(),
        structure.iframe_count,
        target
    );
    for form in &structure.forms {
        println!("form id={} action={} method={}", form.id, form.action, form.method);
    }
    for input in &structure.inputs {
        println!(
            "{} name={} id={} type={} {}",
            input.tag,
            input.name,
            input.id,
            input.input_type,
            if input.visible { "VISIBLE" } else { "HIDDEN" }
        );
    }

    let fields = &config.plan.fields;
    let expected = vec![
        fields.phone.clone(),
        fields.name.clone(),
        fields.address1.clone(),
        fields.address2.clone(),
        fields.city.clone(),
        fields.postal_code.clone(),
        fields.region.clone(),
    ];
    println!("\nExpected field availability:");
    for (selector, present) in diagnostics::field_availability(backend, &expected).await {
        println!("{}: {}", selector, if present { "FOUND" } else { "NOT FOUND" });
    }
    Ok(())
}
