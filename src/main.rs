use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vantage::search::duration::format_age;
use vantage::worldmap::worldmap_widget;
use vantage::{
    ContactViewer, DataManager, FileSource, GroupKind, ItemRef, MirrorSource, SearchOptions,
    Settings, Sort, Viewer,
};

#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(about = "Search and summarize a monitoring mirror")]
struct Args {
    /// Path to the mirror JSON file
    #[arg(short, long, default_value = "mirror.json")]
    mirror: PathBuf,

    /// Settings file (TOML, YAML or JSON); VANTAGE_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Contact to view the mirror as; everything is visible when omitted
    #[arg(short, long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search hosts and services
    Search {
        /// Search string, e.g. 'type:host isnot:ack bi:>=3'
        #[arg(default_value = "")]
        query: String,

        #[arg(long, value_enum)]
        sort: Option<Sort>,

        /// Match `host:` terms against templates
        #[arg(long)]
        templates: bool,
    },

    /// State synthesis of hosts and services
    Synthesis {
        /// Restrict the synthesis to the results of this search
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Look up `host`, `host/service` or a contact
    Element { name: String },

    /// Groups with their hierarchy levels
    Groups {
        #[arg(value_enum)]
        kind: GroupKind,
    },

    /// Tag usage counts
    Tags {
        #[arg(value_enum)]
        kind: TagKind,
    },

    /// Hosts with GPS coordinates
    Worldmap {
        #[arg(short, long, default_value = "type:host")]
        search: String,

        /// Case-insensitive filter on host names
        #[arg(long)]
        refine: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Unhandled problems at or above `problems_business_impact`
    Problems,

    /// Overall dashboard state
    Overall,

    /// Print the synthesis each time the mirror file changes
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value = "5")]
        refresh: u64,

        #[arg(short, long)]
        query: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TagKind {
    Host,
    Service,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    init_tracing(&settings.log_level);

    let mut source = FileSource::new(&args.mirror);
    let mirror = source.poll().ok_or_else(|| {
        anyhow!(
            "Failed to load mirror {}: {}",
            args.mirror.display(),
            source.error().unwrap_or("no data")
        )
    })?;
    let mut dm = DataManager::new(mirror, settings);

    if let Commands::Watch { refresh, query } = &args.command {
        return watch(
            &mut dm,
            &mut source,
            args.user.as_deref(),
            query.as_deref(),
            Duration::from_secs(*refresh),
        );
    }

    let viewer = resolve_viewer(&dm, args.user.as_deref())?;
    let output = run(&dm, &args.command, viewer.as_ref().map(|v| v as &dyn Viewer))?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_viewer<'a>(dm: &'a DataManager, user: Option<&str>) -> Result<Option<ContactViewer<'a>>> {
    match user {
        None => Ok(None),
        Some(name) => ContactViewer::find(name, dm.mirror())
            .map(Some)
            .ok_or_else(|| anyhow!("Unknown contact: {}", name)),
    }
}

fn run(dm: &DataManager, command: &Commands, viewer: Option<&dyn Viewer>) -> Result<Value> {
    let now = unix_now();

    let output = match command {
        Commands::Search {
            query,
            sort,
            templates,
        } => {
            let options = SearchOptions {
                sort: *sort,
                want_templates: *templates,
            };
            let items = dm.search_with(query, viewer, options);
            Value::Array(items.into_iter().map(|i| item_json(i, now)).collect())
        }
        Commands::Synthesis { query } => {
            let items = query.as_deref().map(|q| dm.search(q, viewer));
            serde_json::to_value(dm.synthesis(items.as_deref(), viewer))?
        }
        Commands::Element { name } => match dm.element(name, viewer) {
            Some(item) => item_json(item, now),
            None => bail!("No element named {}", name),
        },
        Commands::Groups { kind } => {
            let levels = dm.group_levels(*kind, viewer);
            let groups: Vec<Value> = dm
                .groups(*kind, viewer, None)
                .into_iter()
                .map(|g| {
                    json!({
                        "name": g.name,
                        "alias": g.alias,
                        "level": levels.get(&g.name),
                        "members": g.members,
                        "children": g.children,
                    })
                })
                .collect();
            Value::Array(groups)
        }
        Commands::Tags { kind } => {
            let tags = match kind {
                TagKind::Host => dm.host_tags(),
                TagKind::Service => dm.service_tags(),
            };
            Value::Object(
                tags.into_iter()
                    .map(|(tag, count)| (tag.to_string(), json!(count)))
                    .collect(),
            )
        }
        Commands::Worldmap {
            search,
            refine,
            limit,
        } => {
            let map = &dm.settings().worldmap;
            let hosts = worldmap_widget(
                dm,
                search,
                refine.as_deref(),
                limit.unwrap_or(usize::MAX),
                viewer,
            );
            json!({
                "center": { "lat": map.lat, "lng": map.lng, "zoom": map.zoom },
                "hosts": hosts,
            })
        }
        Commands::Problems => Value::Array(
            dm.problems(viewer)
                .into_iter()
                .map(|i| item_json(i, now))
                .collect(),
        ),
        Commands::Overall => {
            let synthesis = dm.synthesis(None, viewer);
            let (hosts_state, services_state) = dm.overall_it_state(viewer);
            json!({
                "initialized": dm.is_initialized(),
                "generation": dm.mirror().generation(),
                "framework_status": dm.framework_status(),
                "overall_state": dm.overall_state(viewer),
                "it_state": { "hosts": hosts_state, "services": services_state },
                "synthesis": synthesis,
            })
        }
        Commands::Watch { .. } => bail!("watch runs on its own loop"),
    };
    Ok(output)
}

fn watch(
    dm: &mut DataManager,
    source: &mut FileSource,
    user: Option<&str>,
    query: Option<&str>,
    refresh: Duration,
) -> Result<()> {
    info!(source = source.description(), interval = ?refresh, "watching mirror");
    print_synthesis(dm, user, query)?;

    loop {
        thread::sleep(refresh);
        if dm.refresh(source) {
            print_synthesis(dm, user, query)?;
        }
    }
}

fn print_synthesis(dm: &DataManager, user: Option<&str>, query: Option<&str>) -> Result<()> {
    let viewer = resolve_viewer(dm, user)?;
    let viewer = viewer.as_ref().map(|v| v as &dyn Viewer);
    let items = query.map(|q| dm.search(q, viewer));
    let summary = dm.synthesis(items.as_deref(), viewer);

    let output = json!({
        "generation": dm.mirror().generation(),
        "hosts": summary.hosts,
        "services": summary.services,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn item_json(item: ItemRef<'_>, now: i64) -> Value {
    let Some(monitored) = item.as_monitored() else {
        return json!({ "type": item.kind().as_str(), "name": item.full_name() });
    };
    let status = monitored.status();
    json!({
        "type": item.kind().as_str(),
        "name": item.full_name(),
        "state": monitored.state_name(),
        "state_type": status.state_type.as_str(),
        "business_impact": status.business_impact,
        "acknowledged": status.acknowledged,
        "in_downtime": status.in_downtime,
        "since": format_age(now - status.last_state_change),
        "output": status.output,
    })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
