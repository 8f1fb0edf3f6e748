use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use harvest_core::TypeRegistry;
use harvest_kubehub::{KubeAccess, KubeSettings};
use harvest_tools::{catalog, ToolSettings, Toolbox};
use serde_json::{Map, Value};
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod mcp;

#[derive(Parser, Debug)]
#[command(name = "harvest-mcp", version, about = "Harvester cluster tools for agents")]
struct Cli {
    /// Path to a kubeconfig file (default: in-cluster, then $KUBECONFIG / ~/.kube/config)
    #[arg(long, env = "HARVEST_KUBECONFIG", global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "HARVEST_CONTEXT", global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve tools over stdio (line-delimited JSON-RPC); the default
    Serve,
    /// Print the tool catalog
    Tools {
        #[arg(short = 'o', long = "output", value_enum, default_value_t = Output::Human)]
        output: Output,
    },
    /// Run one tool and print its result
    Call {
        /// Tool name, e.g. "list_pods"
        tool: String,
        /// Tool argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_kv)]
        args: Vec<(String, String)>,
    },
    /// Ask the cluster whether a resource type is namespace-scoped
    Scope {
        /// Friendly type name, e.g. "vm" or "nodes"
        resource: String,
    },
}

fn parse_kv(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

fn init_tracing() {
    let env = std::env::var("HARVEST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries the protocol
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HARVEST_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid HARVEST_METRICS_ADDR; expected host:port");
        }
    }
}

async fn toolbox(cli: &Cli) -> Result<Toolbox> {
    let settings = KubeSettings { kubeconfig: cli.kubeconfig.clone(), context: cli.context.clone() };
    let access = KubeAccess::connect(&settings).await?;
    Ok(Toolbox::with_access(Arc::new(access), ToolSettings::from_env()))
}

/// Token cancelled on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling");
            trigger.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match &cli.command {
        None | Some(Commands::Serve) => {
            let toolbox = Arc::new(toolbox(&cli).await?);
            info!(tools = toolbox.specs().len(), "serving tools on stdio");
            let reader = BufReader::new(tokio::io::stdin());
            tokio::select! {
                res = mcp::serve(toolbox, reader, tokio::io::stdout()) => { res?; }
                _ = signal::ctrl_c() => { info!("interrupted; shutting down"); }
            }
        }
        Some(Commands::Tools { output }) => {
            let specs = catalog(&TypeRegistry::builtin());
            match output {
                Output::Human => {
                    for s in &specs {
                        let params: Vec<String> =
                            s.params.iter().map(|p| if p.required { p.name.to_string() } else { format!("[{}]", p.name) }).collect();
                        println!("{} • {} • {}", s.name, params.join(" "), s.description);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&specs)?),
            }
        }
        Some(Commands::Call { tool, args }) => {
            let toolbox = toolbox(&cli).await?;
            if toolbox.spec(tool).is_none() {
                bail!("unknown tool {:?}; see `harvest-mcp tools`", tool);
            }
            let args: Map<String, Value> = args.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
            let out = toolbox.call(tool, &args, &ctrl_c_token()).await;
            if out.is_error {
                return Err(anyhow!(out.text));
            }
            println!("{}", out.text);
        }
        Some(Commands::Scope { resource }) => {
            let toolbox = toolbox(&cli).await?;
            let namespaced = toolbox.scope(resource, &ctrl_c_token()).await?;
            println!("{}: {}", resource, if namespaced { "namespaced" } else { "cluster-scoped" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_args_split_on_first_equals() {
        assert_eq!(parse_kv("name=a=b").unwrap(), ("name".to_string(), "a=b".to_string()));
        assert_eq!(parse_kv("namespace=").unwrap().1, "");
        assert!(parse_kv("novalue").is_err());
        assert!(parse_kv("=x").is_err());
    }

    #[test]
    fn subcommand_is_optional() {
        let cli = Cli::try_parse_from(["harvest-mcp"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["harvest-mcp", "call", "get_pod", "--arg", "namespace=default", "--arg", "name=web"]).unwrap();
        match cli.command {
            Some(Commands::Call { tool, args }) => {
                assert_eq!(tool, "get_pod");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
