//! Command-line playground for browsing Solvr endpoints, previewing curl commands and sending requests.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solvr_core::credentials::mask_token;
use solvr_core::{
    catalog, ApiClient, ClientConfig, CredentialStore, EndpointDescriptor, FileCredentialStore,
    ParamLocation, RequestBuilder, RequestDraft,
};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "solvr-playground")]
#[command(about = "Interactive playground for the Solvr API", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// API base URL [default: $SOLVR_API_URL or https://api.solvr.dev/v1]
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every endpoint in the catalog
    List,

    /// Describe an endpoint and preview the request for the given values
    Show {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Send the request and print the status and body
    Send {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Store a bearer token in the Solvr config file
    Login {
        #[arg(value_name = "TOKEN")]
        token: String,
    },

    /// Remove the stored bearer token
    Logout,

    /// Show the stored token, masked
    Whoami,
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Endpoint id, as printed by `list`
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,

    /// Parameter value (repeatable: -p id=123 -p direction=up)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Bearer token for this request [default: stored token]
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Send without any token, even if one is stored
    #[arg(long, conflicts_with = "token")]
    anonymous: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Initialize tracing subscriber based on verbosity
fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,solvr_core=info,solvr_playground=info".to_string(),
            2 => "info,solvr_core=debug,solvr_playground=debug".to_string(),
            _ => "debug,solvr_core=trace,solvr_playground=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(verbose >= 3)
                .with_line_number(verbose >= 3)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn credential_store() -> Result<FileCredentialStore> {
    let path = FileCredentialStore::default_path()
        .context("cannot locate the Solvr config file; set SOLVR_CONFIG")?;
    Ok(FileCredentialStore::new(path))
}

fn client_config(base_url: Option<&str>) -> ClientConfig {
    match base_url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env(),
    }
}

fn find_endpoint(id: &str) -> Result<EndpointDescriptor> {
    match catalog::find(id) {
        Some(endpoint) => Ok(endpoint),
        None => bail!("unknown endpoint '{id}'; run `solvr-playground list` to see them"),
    }
}

fn draft_for(
    endpoint: &EndpointDescriptor,
    args: &RequestArgs,
    store: &dyn CredentialStore,
) -> RequestDraft {
    let mut draft = RequestDraft::new();
    for (name, value) in &args.params {
        if endpoint.parameter(name).is_none() {
            tracing::warn!(endpoint = %endpoint.id, param = %name, "parameter is not declared by this endpoint");
        }
        draft.set(name, value);
    }
    let token = if args.anonymous {
        None
    } else {
        args.token.clone().or_else(|| store.get_token())
    };
    draft.set_token(token);
    draft
}

fn print_catalog() {
    for endpoint in catalog::endpoints() {
        let lock = if endpoint.auth.requires_token() { " [auth]" } else { "" };
        println!(
            "{:<16} {:<6} {}{}",
            endpoint.id,
            endpoint.method.as_str(),
            endpoint.path,
            lock
        );
    }
}

fn print_parameters(endpoint: &EndpointDescriptor) {
    println!("{} {}", endpoint.method, endpoint.path);
    if !endpoint.description.is_empty() {
        println!("{}", endpoint.description);
    }
    if endpoint.parameters.is_empty() {
        return;
    }
    println!();
    for param in &endpoint.parameters {
        let location = match endpoint.location_of(&param.name) {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Body => "body",
        };
        let required = if param.required { "required" } else { "optional" };
        println!(
            "  {:<18} {:<7} {:<6} {:<9} {}",
            param.name,
            param.param_type.as_str(),
            location,
            required,
            param.description
        );
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = client_config(cli.base_url.as_deref());

    match cli.command {
        Commands::List => print_catalog(),
        Commands::Show { request } => {
            let endpoint = find_endpoint(&request.endpoint)?;
            let store = credential_store()?;
            let draft = draft_for(&endpoint, &request, &store);
            let built = RequestBuilder::new(&endpoint, &config.base_url).build(&draft);

            print_parameters(&endpoint);
            println!();
            println!("{}", built.url);
            println!();
            println!("{}", built.curl_command);
        }
        Commands::Send { request } => {
            let endpoint = find_endpoint(&request.endpoint)?;
            let store = Arc::new(credential_store()?);
            let draft = draft_for(&endpoint, &request, store.as_ref());
            let client = ApiClient::new(&config, store);

            let response = RequestBuilder::new(&endpoint, client.base_url())
                .execute(&client, &draft)
                .context("request failed")?;
            println!("HTTP {}", response.status);
            println!("{}", response.body.render());
        }
        Commands::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                bail!("token must not be empty");
            }
            let store = credential_store()?;
            store.set_token(token)?;
            tracing::info!(path = %store.path().display(), "stored token");
            println!("Logged in as {}", mask_token(token));
        }
        Commands::Logout => {
            let store = credential_store()?;
            store.clear_token()?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let store = credential_store()?;
            match store.get_token() {
                Some(token) => println!("{}", mask_token(&token)),
                None => println!("Not logged in"),
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_verbosity);
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvr_core::MemoryCredentialStore;

    fn args(endpoint: &str, params: &[(&str, &str)]) -> RequestArgs {
        RequestArgs {
            endpoint: endpoint.to_string(),
            params: params
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            token: None,
            anonymous: false,
        }
    }

    #[test]
    fn parse_param_splits_on_first_equals() {
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_param("q=").unwrap(), ("q".to_string(), String::new()));
        assert!(parse_param("=x").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn draft_prefers_explicit_token() {
        let endpoint = find_endpoint("me").unwrap();
        let store = MemoryCredentialStore::with_token("stored_token_value");

        let draft = draft_for(&endpoint, &args("me", &[]), &store);
        assert_eq!(draft.token(), Some("stored_token_value"));

        let mut explicit = args("me", &[]);
        explicit.token = Some("flag_token".to_string());
        let draft = draft_for(&endpoint, &explicit, &store);
        assert_eq!(draft.token(), Some("flag_token"));

        let mut anonymous = args("me", &[]);
        anonymous.anonymous = true;
        let draft = draft_for(&endpoint, &anonymous, &store);
        assert_eq!(draft.token(), None);
    }

    #[test]
    fn draft_carries_param_values() {
        let endpoint = find_endpoint("vote").unwrap();
        let store = MemoryCredentialStore::new();
        let draft = draft_for(&endpoint, &args("vote", &[("id", "p1"), ("direction", "up")]), &store);
        assert_eq!(draft.value("id"), Some("p1"));
        assert_eq!(draft.value("direction"), Some("up"));
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let err = find_endpoint("nope").unwrap_err();
        assert!(err.to_string().contains("unknown endpoint 'nope'"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
