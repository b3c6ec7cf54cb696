//! Compose Overlay CLI
//!
//! Replays a script of user actions against a simulated host page and prints
//! what the page ends up with.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use compose_overlay::dom::MemoryDocument;
use compose_overlay::observer::parse_events;
use compose_overlay::panel::{ConversationTurn, PanelPreview};
use compose_overlay::{
    GenerateError, HostDocument, HostEvent, MessageGenerator, NodeId, OverlayConfig,
    OverlayRuntime, OverlayView,
};
use futures::future::{self, BoxFuture, FutureExt};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Compose Overlay - replay user actions against a simulated messaging page
#[derive(Parser, Debug)]
#[command(name = "compose-overlay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON script of steps; a built-in demo runs if omitted
    #[arg(long)]
    script: Option<PathBuf>,

    /// JSON array of raw host events to replay instead of a script
    #[arg(long, conflicts_with = "script")]
    events: Option<PathBuf>,

    /// Print the panel preview after every change
    #[arg(long)]
    preview: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Something the simulated user does
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    Focus,
    Blur,
    Click { target: Target },
    Type { text: String },
    /// Make the next generation fail
    FailNext,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Target {
    Field,
    Trigger,
    Layer,
    Panel,
    Generate,
    Insert,
    Clear,
    Close,
}

fn demo_script() -> Vec<Step> {
    vec![
        Step::Focus,
        Step::Click { target: Target::Trigger },
        Step::Type {
            text: "Reply to the recruiter and thank them".to_string(),
        },
        Step::Click { target: Target::Generate },
        Step::Click { target: Target::Insert },
        Step::Blur,
    ]
}

/// Canned replies, with a switch to simulate an outage
struct ScriptedGenerator {
    reply: String,
    fail_next: Arc<AtomicBool>,
}

impl MessageGenerator for ScriptedGenerator {
    fn generate(&self, _history: Vec<ConversationTurn>) -> BoxFuture<'static, Result<String, GenerateError>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return future::ready(Err(GenerateError::Failed("simulated outage".to_string()))).boxed();
        }
        future::ready(Ok(self.reply.clone())).boxed()
    }
}

/// `body > div.msg-form > div.msg-form__contenteditable`
fn demo_page(config: &OverlayConfig) -> anyhow::Result<(MemoryDocument, NodeId)> {
    let mut doc = MemoryDocument::new();
    let form = doc.create_element("div");
    doc.set_attribute(form, "class", "msg-form")?;
    let field = doc.create_element("div");
    doc.set_attribute(field, "class", &format!("{} t-14", config.field.composition_class))?;
    doc.set_attribute(field, "contenteditable", "true")?;
    doc.set_attribute(field, &config.field.marker_attribute, "false")?;
    doc.append_child(doc.body(), form)?;
    doc.append_child(form, field)?;
    Ok((doc, field))
}

fn resolve(runtime: &OverlayRuntime<MemoryDocument>, field: NodeId, target: Target) -> Option<NodeId> {
    let controls = runtime.panel_controls();
    match target {
        Target::Field => Some(field),
        Target::Trigger => runtime.trigger_node(),
        Target::Layer => runtime.panel_layer(),
        Target::Panel => controls.map(|c| c.content),
        Target::Generate => controls.map(|c| c.generate),
        Target::Insert => controls.map(|c| c.insert),
        Target::Clear => controls.map(|c| c.clear),
        Target::Close => controls.map(|c| c.close),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = OverlayConfig::load_or_default(cli.config.as_deref()).context("loading config")?;
    let steps: Vec<Step> = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing script {}", path.display()))?
        }
        None => demo_script(),
    };

    let (doc, field) = demo_page(&config)?;
    let fail_next = Arc::new(AtomicBool::new(false));
    let generator = Arc::new(ScriptedGenerator {
        reply: config.canned_reply.clone(),
        fail_next: Arc::clone(&fail_next),
    });

    let preview = cli.preview;
    let mut runtime = OverlayRuntime::new(doc, config.clone(), generator).with_renderer(
        move |view: &OverlayView<'_>| {
            if !preview {
                return;
            }
            println!("-- {:?}", view.state);
            if let Some(panel) = view.panel {
                println!("{}", PanelPreview::new(panel).render_to_string(72, 18));
            }
        },
    );

    if let Some(path) = &cli.events {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading events {}", path.display()))?;
        let events = parse_events(&text).with_context(|| format!("parsing events {}", path.display()))?;
        info!("Replaying {} host events", events.len());
        runtime.run(futures::stream::iter(events)).await;
        print_summary(&runtime, field, &config);
        return Ok(());
    }

    info!("Replaying {} steps", steps.len());
    for step in steps {
        let event = match step {
            Step::Focus => {
                let marker = &config.field.marker_attribute;
                runtime.document_mut().set_attribute(field, marker, &config.field.marker_value)?;
                HostEvent::FocusIn { target: field }
            }
            Step::Blur => {
                let marker = &config.field.marker_attribute;
                runtime.document_mut().set_attribute(field, marker, "false")?;
                HostEvent::FocusOut { target: field }
            }
            Step::Click { target } => match resolve(&runtime, field, target) {
                Some(node) => HostEvent::Click { target: node },
                None => {
                    warn!("Skipping click on {target:?}: not on the page");
                    continue;
                }
            },
            Step::Type { text } => match runtime.panel_controls() {
                Some(controls) => HostEvent::Input {
                    target: controls.prompt,
                    value: text,
                },
                None => {
                    warn!("Skipping typing: panel is not open");
                    continue;
                }
            },
            Step::FailNext => {
                fail_next.store(true, Ordering::SeqCst);
                continue;
            }
        };
        runtime.handle_event(event);
        runtime.settle().await;
    }

    print_summary(&runtime, field, &config);
    Ok(())
}

fn print_summary(runtime: &OverlayRuntime<MemoryDocument>, field: NodeId, config: &OverlayConfig) {
    let doc = runtime.document();
    println!("state: {:?}", runtime.state());
    println!("field content: {}", doc.inner_html(field).unwrap_or("(unchanged)"));
    println!(
        "input events seen by the page: {}",
        doc.deliveries_at(doc.body(), &config.input_event)
    );
    println!("\n{}", doc.outline());
}
