//! `campaign-studio` CLI entry-point.
//!
//! Operates the campaign collection stored under `--data-dir`.
//!
//! Available sub-commands:
//! - `list`, `create`, `show`, `rename`, `activate`, `deactivate`, `clone`,
//!   `delete`: manage campaigns.
//! - `node-types`: list the step types and their defaults.
//! - `add-node`, `move-node`, `set-title`, `update-node`, `set-options`,
//!   `connect`, `remove-node`, `remove-edge`, `clear-flow`: edit a
//!   campaign's flow.
//! - `validate`: check a flow JSON file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use campaigns::{
    Campaign, CampaignError, CampaignQuery, CampaignStore, EditingSession, SharedStore,
    SortOrder, StatusFilter,
};
use clap::{Parser, Subcommand, ValueEnum};
use flow::{Connection, Flow, FlowEditor, Position};
use nodes::{defaults_for, NodeType};
use storage::FileBlobStore;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "campaign-studio",
    about = "Author multi-step marketing campaign flows",
    version
)]
struct Cli {
    /// Directory the campaign collection is stored in.
    #[arg(long, env = "CAMPAIGN_STUDIO_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Status {
    All,
    Active,
    Inactive,
}

#[derive(Subcommand)]
enum Command {
    /// List campaigns, newest first.
    List {
        #[arg(long, value_enum, default_value = "all")]
        status: Status,
        /// Case-insensitive text to look for in names and descriptions.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        oldest_first: bool,
    },
    /// Create an empty, inactive campaign.
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Print a campaign as JSON.
    Show { id: Uuid },
    Rename { id: Uuid, name: String },
    Activate { id: Uuid },
    Deactivate { id: Uuid },
    /// Copy a campaign, flow included.
    Clone { id: Uuid },
    Delete { id: Uuid },
    /// List the available step types.
    NodeTypes,
    /// Add a step to a campaign's flow.
    AddNode {
        campaign: Uuid,
        node_type: NodeType,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
    },
    MoveNode {
        campaign: Uuid,
        node: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Set a step's title.  A blank title reverts to the default.
    SetTitle {
        campaign: Uuid,
        node: String,
        title: String,
    },
    /// Merge a JSON object into a step's payload.
    UpdateNode {
        campaign: Uuid,
        node: String,
        /// e.g. '{"template": "Hi {{name}}"}'
        patch: String,
    },
    /// Replace an input step's options, one per line.
    SetOptions {
        campaign: Uuid,
        node: String,
        /// e.g. $'Small\nMedium\nLarge'
        options: String,
    },
    /// Connect two steps.
    Connect {
        campaign: Uuid,
        source: String,
        target: String,
        /// Output port on the source, e.g. "false" for a condition's no-branch.
        #[arg(long)]
        source_handle: Option<String>,
        #[arg(long)]
        target_handle: Option<String>,
    },
    /// Remove a step and every edge attached to it.
    RemoveNode { campaign: Uuid, node: String },
    RemoveEdge { campaign: Uuid, edge: String },
    /// Remove every step and edge from a campaign's flow.
    ClearFlow { campaign: Uuid },
    /// Validate a flow JSON file.
    Validate {
        /// Path to the flow JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let Cli { data_dir, command } = Cli::parse();

    match command {
        Command::Validate { path } => validate(&path),
        command => run(&data_dir, command).await,
    }
}

async fn run(data_dir: &Path, command: Command) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    info!(data_dir = %data_dir.display(), "opening campaign store");
    let store: SharedStore<FileBlobStore> =
        Arc::new(Mutex::new(CampaignStore::open(FileBlobStore::new(data_dir))));

    match command {
        Command::List { status, search, oldest_first } => {
            let mut query = CampaignQuery::default().with_status(match status {
                Status::All => StatusFilter::All,
                Status::Active => StatusFilter::Active,
                Status::Inactive => StatusFilter::Inactive,
            });
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if oldest_first {
                query = query.with_order(SortOrder::OldestFirst);
            }

            let store = store.lock().await;
            let hits = store.query(&query);
            if hits.is_empty() {
                println!("No campaigns.");
            }
            for campaign in hits {
                print_summary(campaign);
            }
        }
        Command::Create { name, description } => {
            let mut store = store.lock().await;
            let mut campaign = store.create();
            if let Some(name) = name {
                campaign.name = name;
            }
            campaign.description = description;
            store.update(campaign.clone());
            check_persisted(&store)?;
            print_summary(&campaign);
        }
        Command::Show { id } => {
            let store = store.lock().await;
            let campaign = store.require(id)?;
            println!("{}", serde_json::to_string_pretty(campaign)?);
        }
        Command::Rename { id, name } => {
            modify(&store, id, |s| s.rename(id, name)).await?;
        }
        Command::Activate { id } => {
            modify(&store, id, |s| s.set_active(id, true)).await?;
        }
        Command::Deactivate { id } => {
            modify(&store, id, |s| s.set_active(id, false)).await?;
        }
        Command::Clone { id } => {
            let mut store = store.lock().await;
            let copy = store.clone_campaign(id).ok_or(CampaignError::NotFound(id))?;
            check_persisted(&store)?;
            print_summary(&copy);
        }
        Command::Delete { id } => {
            modify(&store, id, |s| s.remove(id)).await?;
            println!("Deleted {id}");
        }
        Command::NodeTypes => {
            for node_type in NodeType::ALL {
                let defaults = serde_json::to_string(&defaults_for(node_type))?;
                println!(
                    "{:<10} {:<13} {defaults}",
                    node_type.as_str(),
                    node_type.category().label()
                );
            }
        }
        Command::AddNode { campaign, node_type, x, y } => {
            edit(&store, campaign, |editor| {
                let node = editor.add_node_at(node_type, Position::new(x, y));
                println!("{}", node.id);
                Ok(())
            })
            .await?;
        }
        Command::MoveNode { campaign, node, x, y } => {
            edit(&store, campaign, |editor| {
                if !editor.move_node(&node, Position::new(x, y)) {
                    bail!("no step {node} in campaign {campaign}");
                }
                Ok(())
            })
            .await?;
        }
        Command::SetTitle { campaign, node, title } => {
            edit(&store, campaign, |editor| {
                if !editor.edit_title(&node, &title) {
                    bail!("no step {node} in campaign {campaign}");
                }
                editor.blur_title(&node);
                Ok(())
            })
            .await?;
        }
        Command::UpdateNode { campaign, node, patch } => {
            let patch: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&patch).context("patch must be a JSON object")?;
            edit(&store, campaign, |editor| {
                if !editor.update_node_data(&node, &patch)? {
                    bail!("no step {node} in campaign {campaign}");
                }
                Ok(())
            })
            .await?;
        }
        Command::SetOptions { campaign, node, options } => {
            edit(&store, campaign, |editor| {
                if !editor.set_input_options(&node, &options)? {
                    bail!("no step {node} in campaign {campaign}");
                }
                Ok(())
            })
            .await?;
        }
        Command::Connect { campaign, source, target, source_handle, target_handle } => {
            edit(&store, campaign, |editor| {
                let connection = Connection {
                    source,
                    target,
                    source_handle,
                    target_handle,
                };
                match editor.connect(connection) {
                    Some(edge) => println!("{}", edge.id),
                    None => bail!("both ends must be steps of campaign {campaign}"),
                }
                Ok(())
            })
            .await?;
        }
        Command::RemoveNode { campaign, node } => {
            edit(&store, campaign, |editor| {
                if editor.remove_node(&node).is_none() {
                    bail!("no step {node} in campaign {campaign}");
                }
                Ok(())
            })
            .await?;
        }
        Command::RemoveEdge { campaign, edge } => {
            edit(&store, campaign, |editor| {
                if editor.remove_edge(&edge).is_none() {
                    bail!("no edge {edge} in campaign {campaign}");
                }
                Ok(())
            })
            .await?;
        }
        Command::ClearFlow { campaign } => {
            edit(&store, campaign, |editor| {
                editor.clear();
                Ok(())
            })
            .await?;
        }
        Command::Validate { path } => validate(&path)?,
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(campaign: &Campaign) {
    let state = if campaign.active { "active" } else { "inactive" };
    println!(
        "{}  {:<8}  {}  ({} steps, {} edges, created {})",
        campaign.id,
        state,
        campaign.name,
        campaign.flow.nodes.len(),
        campaign.flow.edges.len(),
        campaign.created_at.format("%Y-%m-%d %H:%M"),
    );
}

/// The store keeps going when a write fails; a one-shot command should not.
fn check_persisted(store: &CampaignStore<FileBlobStore>) -> anyhow::Result<()> {
    if store.persist_failures() > 0 {
        bail!("change could not be written to {}", store.backend().root().display());
    }
    Ok(())
}

async fn modify<F>(store: &SharedStore<FileBlobStore>, id: Uuid, op: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut CampaignStore<FileBlobStore>) -> bool,
{
    let mut store = store.lock().await;
    if !op(&mut store) {
        return Err(CampaignError::NotFound(id).into());
    }
    check_persisted(&store)?;
    if let Some(campaign) = store.get(id) {
        print_summary(campaign);
    }
    Ok(())
}

/// Run one editing step against a campaign's flow and write the result.
async fn edit<F>(store: &SharedStore<FileBlobStore>, id: Uuid, op: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut FlowEditor) -> anyhow::Result<()>,
{
    let mut session = EditingSession::open_existing(store, id).await?;
    op(session.editor_mut())?;
    let flow = session.close().await?;

    check_persisted(&*store.lock().await)?;
    info!(campaign_id = %id, nodes = flow.nodes.len(), edges = flow.edges.len(), "flow saved");
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;

    let flow: Flow = match serde_json::from_str(&content) {
        Ok(flow) => flow,
        Err(e) => {
            eprintln!("❌ Invalid flow JSON: {e}");
            std::process::exit(1);
        }
    };

    match flow::validate_flow(&flow) {
        Ok(()) => {
            println!(
                "✅ Flow is valid: {} steps, {} edges.",
                flow.nodes.len(),
                flow.edges.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Validation failed: {e}");
            std::process::exit(1);
        }
    }
}
