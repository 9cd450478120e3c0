use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::rc::Rc;

mod config;
mod diagnostics;
mod error;
mod extension;
mod policy;
mod render;
mod resource;
mod topology;

use config::Config;
use diagnostics::{Diagnostics, TracingDiagnostics};
use extension::{
    DanglingReferences, EffectivePolicies, PolicyAttachment, ReferenceGrantCheck, execute_all,
};
use policy::PolicyManager;
use render::View;
use resource::{LabelSelector, Object, ObjectFetcher, ObjectStore, ResourceType};
use topology::{Builder, GATEWAY_RELATIONS, Graph, Node};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "gwinspect")]
#[command(about = "Inspect Gateway API topology and policies from manifests", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resources or policies.
    Get {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show resources or policies in detail, with relations and effective policies.
    Describe {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Comma separated resource types, e.g. `gateways,httproutes`.
    types: String,

    name: Option<String>,

    /// Manifest files to read objects from.
    #[arg(short = 'f', long = "filename", required = true)]
    files: Vec<PathBuf>,

    #[arg(short = 'n', long, default_value = "default")]
    namespace: String,

    #[arg(short = 'A', long)]
    all_namespaces: bool,

    /// Label selector for plain resources, e.g. `app=web,tier!=cache,canary`.
    #[arg(short = 'l', long)]
    selector: Option<String>,

    /// YAML file overriding the policy label, inheritance links and grant rules.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Wide,
    Graph,
    Json,
    Yaml,
}

/// What to select and how to print it.
#[derive(Debug)]
struct Query {
    types: Vec<ResourceType>,
    name: Option<String>,
    /// `None` means all namespaces.
    namespace: Option<String>,
    selector: LabelSelector,
    output: OutputFormat,
    describe: bool,
}

impl Query {
    fn from_args(args: &TargetArgs, output: OutputFormat, describe: bool) -> Result<Self> {
        Ok(Self {
            types: ResourceType::parse_list(&args.types)?,
            name: args.name.clone(),
            namespace: (!args.all_namespaces).then(|| args.namespace.clone()),
            selector: LabelSelector::parse(args.selector.as_deref().unwrap_or(""))?,
            output,
            describe,
        })
    }

    /// Describe, wide and graph output need relations and pipeline annotations.
    fn full_graph(&self) -> bool {
        self.describe || matches!(self.output, OutputFormat::Wide | OutputFormat::Graph)
    }

    fn needs_policies(&self) -> bool {
        self.full_graph()
            || self
                .types
                .iter()
                .any(|t| matches!(t, ResourceType::Policies | ResourceType::PolicyCrds))
    }
}

/// Start objects for plain kinds, and policy types as standalone nodes
/// carrying their typed policy payload.
struct Selection {
    sources: Vec<Object>,
    policy_nodes: Vec<(ResourceType, Node)>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.cmd {
        Commands::Get { target, output } => inspect(&target, output, false),
        Commands::Describe { target } => inspect(&target, OutputFormat::Table, true),
    }
}

fn inspect(args: &TargetArgs, output: OutputFormat, describe: bool) -> Result<()> {
    // 1) Inputs: query, configuration, manifests.
    let query = Query::from_args(args, output, describe)?;
    let config = Config::load(args.config.as_deref())?;
    let store = ObjectStore::from_files(&args.files).context("loading manifests")?;
    tracing::debug!("loaded {} objects from {} files", store.len(), args.files.len());

    // 2) Select, build, annotate and render.
    let (text, pipeline) = run(&query, &store, &config, &TracingDiagnostics, Utc::now())?;

    // 3) Print. A failed pipeline still prints what it managed to annotate.
    if text.is_empty() {
        eprintln!("No resources found");
    } else {
        print!("{}", text);
    }
    pipeline.context("annotating topology graph")?;
    Ok(())
}

/// Rendered output plus the outcome of the annotation pipeline. The text is
/// rendered from the partially annotated graph when a pass fails.
fn run(
    query: &Query,
    fetcher: &dyn ObjectFetcher,
    config: &Config,
    diagnostics: &dyn Diagnostics,
    now: DateTime<Utc>,
) -> Result<(String, std::result::Result<(), error::Error>)> {
    let mut manager = PolicyManager::new(fetcher, diagnostics, config);
    if query.needs_policies() {
        manager.init()?;
    }

    let Selection {
        sources,
        policy_nodes,
    } = select(query, fetcher, &manager)?;

    // Full closure plus the annotation pipeline, or identities only.
    let builder = Builder::new(fetcher, diagnostics).start_from(sources);
    let mut graph = if query.full_graph() {
        builder.use_relations(GATEWAY_RELATIONS).build()?
    } else {
        builder.build()?
    };
    let pipeline = if query.full_graph() {
        annotate(&mut graph, fetcher, &manager, config, diagnostics)
    } else {
        Ok(())
    };

    if query.output == OutputFormat::Graph {
        return Ok((render::to_dot(&graph)?, pipeline));
    }

    let source_nodes = graph.source_nodes();
    let mut selected: Vec<&Node> = Vec::new();
    for t in &query.types {
        match t {
            ResourceType::Kind(group_kind) => selected
                .extend(source_nodes.iter().copied().filter(|n| n.gknn().is(group_kind))),
            _ => selected.extend(
                policy_nodes
                    .iter()
                    .filter(|(owner, _)| owner == t)
                    .map(|(_, node)| node),
            ),
        }
    }

    let text = match (query.describe, query.output) {
        (true, _) => render::render_nodes(&selected, View::Describe, now)?,
        (false, OutputFormat::Json) => render::render_objects(&selected, true)?,
        (false, OutputFormat::Yaml) => render::render_objects(&selected, false)?,
        (false, OutputFormat::Wide) => render::render_nodes(&selected, View::Wide, now)?,
        (false, _) => render::render_nodes(&selected, View::Table, now)?,
    };
    Ok((text, pipeline))
}

fn select(
    query: &Query,
    fetcher: &dyn ObjectFetcher,
    manager: &PolicyManager<'_>,
) -> Result<Selection> {
    let namespace = query.namespace.as_deref();
    let name = query.name.as_deref();

    let mut selection = Selection {
        sources: Vec::new(),
        policy_nodes: Vec::new(),
    };
    for t in &query.types {
        match t {
            ResourceType::Kind(group_kind) => {
                let objects: Vec<Object> = fetcher
                    .list(group_kind, namespace)
                    .with_context(|| format!("listing {}", group_kind))?
                    .into_iter()
                    .filter(|o| name.is_none_or(|n| o.name() == n))
                    .filter(|o| query.selector.matches(&o.labels))
                    .collect();
                if let (Some(n), true) = (name, objects.is_empty()) {
                    bail!("{} {:?} not found", group_kind, n);
                }
                selection.sources.extend(objects);
            }
            ResourceType::Policies => {
                for policy in manager.policies() {
                    let gknn = policy.gknn();
                    if namespace.is_some_and(|ns| gknn.namespace != ns)
                        || name.is_some_and(|n| gknn.name != n)
                    {
                        continue;
                    }
                    let mut node = Node::new(policy.object().clone());
                    node.metadata.policy = Some(Rc::clone(policy));
                    selection.policy_nodes.push((t.clone(), node));
                }
            }
            ResourceType::PolicyCrds => {
                for crd in manager.crds() {
                    if name.is_some_and(|n| crd.name() != n) {
                        continue;
                    }
                    let mut node = Node::new(crd.object().clone());
                    node.metadata.policy_crd = Some(Rc::clone(crd));
                    selection.policy_nodes.push((t.clone(), node));
                }
            }
        }
    }
    Ok(selection)
}

/// Run the canonical pass order: attach, inherit, grants, dangling refs.
fn annotate(
    graph: &mut Graph,
    fetcher: &dyn ObjectFetcher,
    manager: &PolicyManager<'_>,
    config: &Config,
    diagnostics: &dyn Diagnostics,
) -> std::result::Result<(), error::Error> {
    let attachment = PolicyAttachment::new(manager, diagnostics);
    let effective = EffectivePolicies::new(config);
    let grants = ReferenceGrantCheck::new(fetcher, config, diagnostics);
    execute_all(
        graph,
        &[&attachment, &effective, &grants, &DanglingReferences],
        diagnostics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, InheritanceLink};
    use crate::diagnostics::RecordingDiagnostics;
    use pretty_assertions::assert_eq;

    const POLICIES: &str = include_str!("../testdata/policies.yaml");

    fn query(types: &str, output: OutputFormat) -> Query {
        Query {
            types: ResourceType::parse_list(types).unwrap(),
            name: None,
            namespace: Some("default".to_string()),
            selector: LabelSelector::default(),
            output,
            describe: false,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-11T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn failed_pipeline_still_renders_partial_annotations() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        // Attachment runs, then the merge rejects the unknown relation.
        let config = Config {
            inheritance: vec![InheritanceLink {
                relation: "Owner".to_string(),
                direction: Direction::Outgoing,
            }],
            ..Config::default()
        };
        let mut q = query("gateways", OutputFormat::Table);
        q.describe = true;

        let (text, pipeline) = run(&q, &store, &config, &diagnostics, now()).unwrap();
        assert!(text.starts_with("Name: demo-gateway\n"));
        assert!(text.contains("HealthCheckPolicy.foo.com/default/health-check-gateway"));
        assert!(!text.contains("EffectivePolicies"));
        assert_eq!(
            pipeline.unwrap_err().to_string(),
            "extension EffectivePolicies failed: inheritance link uses unknown relation \"Owner\""
        );
    }

    #[test]
    fn successful_pipeline_reports_effective_policies() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let mut q = query("gateways", OutputFormat::Table);
        q.describe = true;

        let (text, pipeline) = run(&q, &store, &Config::default(), &diagnostics, now()).unwrap();
        assert!(pipeline.is_ok());
        assert!(text.contains("EffectivePolicies:\n"));
    }

    #[test]
    fn policies_become_typed_nodes_filtered_by_namespace_and_name() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let config = Config::default();
        let mut manager = PolicyManager::new(&store, &diagnostics, &config);
        manager.init().unwrap();

        let names = |q: &Query| -> Vec<String> {
            select(q, &store, &manager)
                .unwrap()
                .policy_nodes
                .iter()
                .map(|(_, node)| {
                    assert!(node.metadata.policy.is_some());
                    node.gknn().name.clone()
                })
                .collect()
        };

        // Cluster-scoped policies have no namespace and only show with -A.
        let in_default = query("policies", OutputFormat::Table);
        assert_eq!(names(&in_default), vec!["health-check-gateway"]);

        let mut everywhere = query("policies", OutputFormat::Table);
        everywhere.namespace = None;
        assert_eq!(names(&everywhere).len(), 4);

        everywhere.name = Some("timeout-policy-route".to_string());
        assert_eq!(names(&everywhere), vec!["timeout-policy-route"]);

        let crds = select(&query("policycrds", OutputFormat::Table), &store, &manager).unwrap();
        assert_eq!(crds.policy_nodes.len(), 2);
        assert!(crds
            .policy_nodes
            .iter()
            .all(|(t, node)| *t == ResourceType::PolicyCrds && node.metadata.policy_crd.is_some()));
        assert!(crds.sources.is_empty());
    }

    #[test]
    fn missing_named_resource_is_an_error() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let mut q = query("gateways", OutputFormat::Table);
        q.name = Some("nope".to_string());

        let err = run(&q, &store, &Config::default(), &diagnostics, now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gateway.gateway.networking.k8s.io \"nope\" not found"
        );
    }

    #[test]
    fn selector_filters_source_objects() {
        let store = ObjectStore::from_yaml_str(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: default\n  labels:\n    app: web\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: cache\n  namespace: default\n  labels:\n    app: cache\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: bare\n  namespace: default\n",
            "services.yaml",
        )
        .unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let config = Config::default();
        let manager = PolicyManager::new(&store, &diagnostics, &config);

        let names = |selector: &str| -> Vec<String> {
            let mut q = query("services", OutputFormat::Table);
            q.selector = LabelSelector::parse(selector).unwrap();
            select(&q, &store, &manager)
                .unwrap()
                .sources
                .iter()
                .map(|o| o.name().to_string())
                .collect()
        };
        assert_eq!(names(""), vec!["bare", "cache", "web"]);
        assert_eq!(names("app=web"), vec!["web"]);
        assert_eq!(names("app!=web"), vec!["bare", "cache"]);
        assert_eq!(names("app"), vec!["cache", "web"]);
    }

    #[test]
    fn graph_output_is_dot() {
        let store = ObjectStore::from_yaml_str(POLICIES, "policies.yaml").unwrap();
        let diagnostics = RecordingDiagnostics::default();
        let q = query("gateways", OutputFormat::Graph);

        let (text, pipeline) = run(&q, &store, &Config::default(), &diagnostics, now()).unwrap();
        assert!(pipeline.is_ok());
        assert!(text.starts_with("digraph {\n"));
        assert!(text.contains("subgraph cluster_default {"));
    }
}
