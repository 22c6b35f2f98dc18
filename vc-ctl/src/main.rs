//  MAIN.rs
//    by Lut99
//
//  Created:
//    18 Oct 2026, 10:06:27
//  Last edited:
//    19 Oct 2026, 10:15:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Entrypoint to the `virtualclient` executable.
//

#[macro_use]
extern crate human_panic;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, LevelFilter};

use vc_ctl::run::{self, NodeOptions};


/***** ARGUMENTS *****/
/// Defines the toplevel arguments for the `virtualclient` tool.
#[derive(Debug, Parser)]
#[clap(name = "virtualclient", version = env!("CARGO_PKG_VERSION"), about = "Runs workload profiles, alone or together with other nodes in a client/server pair.")]
struct Arguments {
    /// If given, prints `info` and `debug` prints.
    #[clap(long, global = true, env = "DEBUG", help = "If given, prints additional information during execution.")]
    debug  : bool,

    /// The subcommand that can be run.
    #[clap(subcommand)]
    subcommand : VcSubcommand,
}

/// Defines the options that say which node we are.
#[derive(Debug, clap::Args)]
struct NodeArguments {
    /// The path to the node config file.
    #[clap(short, long, default_value = "./node.yml", env = "NODE_CONFIG", help = "The 'node.yml' file that describes this node. Defaults are used if it does not exist.")]
    node_config : PathBuf,
    /// The path to the environment layout.
    #[clap(short, long, env = "LAYOUT", help = "The 'layout.json' file that describes all nodes taking part in a multi-node run.")]
    layout      : Option<PathBuf>,
    /// Overrides the agent ID.
    #[clap(short, long, env = "AGENT_ID", help = "The name of this node as it appears in the layout. Defaults to the one in the node config, then to the hostname.")]
    agent_id    : Option<String>,
}

impl From<NodeArguments> for NodeOptions {
    #[inline]
    fn from(value: NodeArguments) -> Self {
        Self { node_config: value.node_config, layout: value.layout, agent_id: value.agent_id }
    }
}

/// Defines subcommands for the `virtualclient` tool.
#[derive(Debug, Subcommand)]
enum VcSubcommand {
    #[clap(name = "run", about = "Runs the actions in the given profile, while hosting the local API for other nodes.")]
    Run {
        /// The profile to run.
        #[clap(short, long, help = "The profile (YAML or JSON) to run.")]
        profile : PathBuf,

        #[clap(flatten)]
        node : NodeArguments,
    },

    #[clap(name = "api", about = "Only hosts the local API, so other nodes can run components here. Stops on Ctrl-C.")]
    Api {
        #[clap(flatten)]
        node : NodeArguments,
    },
}





/***** ENTRYPOINT *****/
#[tokio::main]
async fn main() {
    // Load the .env file, then parse the arguments
    dotenv().ok();
    let args = Arguments::parse();

    // Configure the logger
    let mut logger = env_logger::builder();
    logger.format_module_path(false);

    if args.debug {
        logger.filter_level(LevelFilter::Debug).init();
    } else {
        logger.filter_level(LevelFilter::Info).init();

        setup_panic!(Metadata {
            name: "Virtual Client".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
            homepage: "".into(),
        });
    }

    // Now match on the command
    let res: Result<(), run::Error> = match args.subcommand {
        VcSubcommand::Run{ profile, node } => run::run(node.into(), profile).await,
        VcSubcommand::Api{ node }          => run::api(node.into()).await,
    };
    if let Err(err) = res {
        error!("{}", err);
        process::exit(1);
    }
}
