// mmctl: Mind-Loom control tool (optional CLI client)
// Build with: cargo build --features cli --bin mmctl

use clap::{Arg, ArgAction, ArgMatches, Command};
use uuid::Uuid;

use mind_loom::api::{self, Backend};
use mind_loom::api::sync::{LoadOutcome, SyncAdapter};
use mind_loom::graph_utils::graph::{MindmapGraph, MindmapId, NodePatch, NodeType, ServerId};
use mind_loom::graph_utils::layout::apply_radial_layout;
use mind_loom::graph_utils::text::ApproxTextMeasure;
use mind_loom::persistence::settings::AppSettings;

fn mindmap_arg() -> Arg {
    Arg::new("mindmap").required(true).value_name("MINDMAP_ID").help("Mindmap uuid")
}

fn cli() -> Command {
    Command::new("mmctl")
        .about("Mind-Loom control tool: inspect and edit stored mindmaps")
        .subcommand_required(true)
        .subcommand(Command::new("show").about("Print the tree outline").arg(mindmap_arg()))
        .subcommand(
            Command::new("layout")
                .about("Run the radial layout and save positions back")
                .arg(mindmap_arg())
                .arg(Arg::new("dry_run").long("dry-run").action(ArgAction::SetTrue).help("Print positions, do not save")),
        )
        .subcommand(
            Command::new("add")
                .about("Append a node under an existing one and save")
                .arg(mindmap_arg())
                .arg(Arg::new("parent").long("parent").required(true).value_name("SERVER_ID"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .default_value("concept")
                        .value_parser(["concept", "formula", "exercise"]),
                )
                .arg(Arg::new("label").long("label").value_name("TEXT")),
        )
}

fn parse_mindmap(m: &ArgMatches) -> anyhow::Result<MindmapId> {
    let raw = m.get_one::<String>("mindmap").map(String::as_str).unwrap_or_default();
    raw.parse::<MindmapId>().map_err(|e| anyhow::anyhow!("invalid mindmap id {:?}: {}", raw, e))
}

fn node_type_from(s: &str) -> NodeType {
    match s {
        "formula" => NodeType::Formula,
        "exercise" => NodeType::Exercise,
        _ => NodeType::Concept,
    }
}

fn print_outline(graph: &MindmapGraph) {
    for id in graph.subtree_preorder(graph.root()) {
        if let Some(n) = graph.get(id) {
            let sid = n.server_id.map(|s| s.to_string()).unwrap_or_else(|| "unsaved".into());
            println!("{}- [{}] {} ({})", "  ".repeat(n.level as usize), n.node_type.display_name(), n.label, sid);
        }
    }
}

/// Load the mindmap. Refuses to continue when the store answered with an
/// error, so a later save can never overwrite remote data with an empty root.
async fn load(backend: &Backend, sync: &mut SyncAdapter, graph: &mut MindmapGraph) -> anyhow::Result<()> {
    let outcome = sync.load(backend.store.as_ref(), graph).await?;
    if let Some(w) = sync.load_warning() {
        anyhow::bail!("{}", w);
    }
    if let LoadOutcome::Applied { repaired, .. } = outcome {
        if repaired > 0 {
            eprintln!("note: repaired {} broken parent link(s)", repaired);
        }
    }
    Ok(())
}

async fn run(matches: ArgMatches, settings: AppSettings) -> anyhow::Result<()> {
    let backend = api::backend_from_settings(&settings)?;
    log::debug!("using backend {}", backend.describe);
    let Some((name, sub)) = matches.subcommand() else {
        anyhow::bail!("missing subcommand");
    };
    let mindmap = parse_mindmap(sub)?;
    let mut sync = SyncAdapter::new(mindmap);
    let mut graph = MindmapGraph::default();
    load(&backend, &mut sync, &mut graph).await?;
    // saved width/height come from the radius hint
    let measure = ApproxTextMeasure::default();
    graph.refresh_radii(&settings.metrics, &measure);

    match name {
        "show" => print_outline(&graph),
        "layout" => {
            apply_radial_layout(&mut graph, &settings.layout);
            if sub.get_flag("dry_run") {
                for n in graph.nodes() {
                    println!("{}\t{:.1}\t{:.1}\t{}", n.local_id, n.pos.x, n.pos.y, n.label);
                }
                return Ok(());
            }
            sync.save(backend.store.as_ref(), &mut graph).await?;
            println!("laid out and saved {} node(s)", graph.node_count());
        }
        "add" => {
            let raw = sub.get_one::<String>("parent").map(String::as_str).unwrap_or_default();
            let parent_sid = Uuid::parse_str(raw.trim())
                .map(ServerId)
                .map_err(|e| anyhow::anyhow!("invalid parent id {:?}: {}", raw, e))?;
            let parent = graph
                .find_by_server_id(parent_sid)
                .map(|n| n.local_id)
                .ok_or_else(|| anyhow::anyhow!("no node {} in mindmap {}", parent_sid, mindmap))?;
            let node_type = node_type_from(sub.get_one::<String>("type").map(String::as_str).unwrap_or("concept"));
            let id = graph.add_node(parent, node_type)?;
            if let Some(label) = sub.get_one::<String>("label") {
                graph.update_node(id, NodePatch { label: Some(label.clone()), ..Default::default() })?;
            }
            graph.refresh_radii(&settings.metrics, &measure);
            sync.save(backend.store.as_ref(), &mut graph).await?;
            let sid = graph.get(id).and_then(|n| n.server_id);
            match sid {
                Some(sid) => println!("added {}", sid),
                None => println!("added (server id not echoed back)"),
            }
        }
        other => anyhow::bail!("unknown subcommand {}", other),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = cli().get_matches();
    let settings = match AppSettings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read settings: {:#}", e);
            std::process::exit(2);
        }
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = runtime.block_on(run(matches, settings)) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
