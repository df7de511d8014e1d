use clap::{Parser, Subcommand};
use forgelink::types::{
    BindingOutcome, BindingRequest, CreateRepositoryRequest, GitProvider, SelectRepositoryRequest,
};
use forgelink::{ForgelinkConfig, GraphqlRemote, RemotePort, RepositoryBindingController};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI arguments for forgelink
#[derive(Parser, Debug)]
#[command(name = "forgelink")]
#[command(about = "Authorize git providers and bind resources to repositories")]
struct Args {
    /// Config file (default: ~/.config/forgelink/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GraphQL endpoint, overrides api.endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the URL that starts a provider's authorization flow
    AuthUrl {
        #[arg(long)]
        provider: GitProvider,
    },

    /// Create a repository in an organization and bind it to a resource
    CreateRepo {
        #[arg(long)]
        resource: String,
        #[arg(long)]
        org: String,
        #[arg(long)]
        provider: GitProvider,
        #[arg(long)]
        name: String,
        #[arg(long)]
        public: bool,
    },

    /// Bind a resource to an existing repository
    ConnectRepo {
        #[arg(long)]
        resource: String,
        #[arg(long)]
        org: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        let default_filter = "warn,forgelink=debug";
        #[cfg(not(debug_assertions))]
        let default_filter = "warn,forgelink=info";
        tracing_subscriber::EnvFilter::new(default_filter)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => ForgelinkConfig::load(path).await?,
        None => ForgelinkConfig::load_default().await?,
    };
    let endpoint = args.endpoint.unwrap_or(config.api.endpoint);

    let mut remote = GraphqlRemote::new(endpoint)?;
    if let Some(token) = config.api.token {
        remote = remote.with_token(token);
    }
    tracing::debug!(endpoint = remote.endpoint(), "Using binding service");
    let remote = Arc::new(remote);

    match args.command {
        Command::AuthUrl { provider } => {
            let authorization = remote.request_authorization_url(provider).await?;
            println!("{}", authorization.url);
        }
        Command::CreateRepo {
            resource,
            org,
            provider,
            name,
            public,
        } => {
            let controller = RepositoryBindingController::new(remote);
            let outcome = controller
                .submit(BindingRequest::CreateRepository(CreateRepositoryRequest {
                    name,
                    is_public: public,
                    organization_id: org,
                    provider,
                    resource_id: resource,
                }))
                .await?;
            print_outcome(&outcome)?;
        }
        Command::ConnectRepo {
            resource,
            org,
            name,
        } => {
            let controller = RepositoryBindingController::new(remote);
            let outcome = controller
                .submit(BindingRequest::SelectRepository(SelectRepositoryRequest {
                    repository_name: name,
                    organization_id: org,
                    resource_id: resource,
                }))
                .await?;
            print_outcome(&outcome)?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: &BindingOutcome) -> anyhow::Result<()> {
    let json = match outcome {
        BindingOutcome::Created(created) => serde_json::to_string_pretty(created)?,
        BindingOutcome::Connected(connected) => serde_json::to_string_pretty(connected)?,
    };
    println!("{}", json);
    Ok(())
}
