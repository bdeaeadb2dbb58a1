use anyhow::Result;
use clap::Parser;
use cozectl::commands::{self, HandlerOutput, run::RunArgs};
use cozectl::oauth::OAuthConfig;
use cozectl::runtime::RealRuntime;

/// cozectl - Coze workflow CLI
///
/// Invoke published Coze workflows, probe API connectivity, and manage
/// access tokens.
///
/// The access token is read from --token, the COZE_API_TOKEN environment
/// variable, or the config file, in that order of precedence.
///
/// Examples:
///   cozectl run 7514923198020304901 "write me a poem"
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Personal access token (also via COZE_API_TOKEN)
    #[arg(
        long = "token",
        short = 't',
        env = "COZE_API_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub token: Option<String>,

    /// API base URL (defaults to https://api.coze.com)
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a published workflow
    Run(RunCliArgs),

    /// Probe API connectivity
    Ping(PingArgs),

    /// Access token operations
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// OAuth token operations
    Oauth {
        #[command(subcommand)]
        command: OauthCommands,
    },
}

#[derive(clap::Args, Debug)]
pub struct RunCliArgs {
    /// The workflow ID (numeric)
    #[arg(value_name = "WORKFLOW_ID")]
    pub workflow_id: String,

    /// User input passed to the workflow
    #[arg(value_name = "INPUT")]
    pub user_input: String,

    /// Associated bot ID
    #[arg(long, value_name = "ID")]
    pub bot_id: Option<String>,

    /// Application ID
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Conversation ID to continue
    #[arg(long, value_name = "ID")]
    pub conversation_id: Option<String>,

    /// System prompt forwarded to the workflow
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Extra workflow parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct PingArgs {
    /// Per-endpoint timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum AuthCommands {
    /// Validate the configured access token
    Check,
}

#[derive(clap::Args, Debug)]
pub struct OauthAppArgs {
    /// OAuth application client ID
    #[arg(long, value_name = "ID")]
    pub client_id: String,

    /// OAuth application client secret (also via COZE_CLIENT_SECRET)
    #[arg(
        long,
        env = "COZE_CLIENT_SECRET",
        value_name = "SECRET",
        hide_env_values = true,
        default_value = ""
    )]
    pub client_secret: String,

    /// Redirect URI registered with the application
    #[arg(
        long,
        value_name = "URI",
        default_value = "http://localhost:8080/callback"
    )]
    pub redirect_uri: String,
}

#[derive(clap::Subcommand, Debug)]
enum OauthCommands {
    /// Print the authorization URL to visit
    AuthorizeUrl {
        #[command(flatten)]
        app: OauthAppArgs,

        /// Requested scope (repeatable)
        #[arg(long = "scope", value_name = "SCOPE")]
        scopes: Vec<String>,

        /// Anti-CSRF state value
        #[arg(long, value_name = "STATE")]
        state: Option<String>,
    },

    /// Exchange an authorization code for tokens
    Exchange {
        #[command(flatten)]
        app: OauthAppArgs,

        /// The authorization code from the redirect
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Refresh an access token
    Refresh {
        #[command(flatten)]
        app: OauthAppArgs,

        /// The refresh token
        #[arg(value_name = "REFRESH_TOKEN")]
        refresh_token: String,
    },
}

impl From<OauthAppArgs> for OAuthConfig {
    fn from(args: OauthAppArgs) -> Self {
        OAuthConfig::new(args.client_id, args.client_secret, args.redirect_uri)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let output: HandlerOutput = match cli.command {
        Commands::Run(args) => {
            let params = args
                .params
                .iter()
                .map(|raw| commands::run::parse_param(raw))
                .collect::<Result<Vec<_>>>()?;

            commands::run::run(
                runtime,
                RunArgs {
                    workflow_id: args.workflow_id,
                    user_input: args.user_input,
                    bot_id: args.bot_id,
                    app_id: args.app_id,
                    conversation_id: args.conversation_id,
                    system_prompt: args.system_prompt,
                    params,
                },
                cli.token,
                cli.base_url,
            )
            .await
        }
        Commands::Ping(args) => commands::ping::ping(runtime, cli.base_url, args.timeout).await,
        Commands::Auth { command } => match command {
            AuthCommands::Check => commands::auth::check(runtime, cli.token, cli.base_url).await,
        },
        Commands::Oauth { command } => match command {
            OauthCommands::AuthorizeUrl { app, scopes, state } => {
                let state = state.unwrap_or_else(|| {
                    format!("state_{}", chrono::Utc::now().timestamp())
                });
                let scopes = (!scopes.is_empty()).then_some(scopes);
                commands::oauth::authorize_url(app.into(), scopes, &state)
            }
            OauthCommands::Exchange { app, code } => {
                commands::oauth::exchange(app.into(), &code).await
            }
            OauthCommands::Refresh { app, refresh_token } => {
                commands::oauth::refresh(app.into(), &refresh_token).await
            }
        },
    };

    println!("{}", output.render());
    if !output.success {
        std::process::exit(1);
    }
    Ok(())
}
