use clap::{Args, Parser, Subcommand};
use eip7702_relay::config::RelayConfig;
use eip7702_relay::delegate::DelegateCall;
use eip7702_relay::eip7702::{
    authorization_signing_hash, decode_raw_transaction_hex, recover_authorization_signer,
    recover_transaction_signer, sign_authorization,
};
use eip7702_relay::error::{RelayError, RelayResult, Stage};
use eip7702_relay::keys::PrivateKey;
use eip7702_relay::relayer::{DelegationRequest, Relayer, Signers};
use eip7702_relay::tx::JsonRpcNode;
use eip7702_relay::types::Address;
use eip7702_relay::utils::logging;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(name = "eip7702-relay", version, about = "Sign and relay EIP-7702 set-code transactions")]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign an authorization tuple delegating the key's account
    Authorize(AuthorizeArgs),

    /// Delegate, execute a call through the delegate and wait for the receipt
    Send(SendArgs),

    /// Decode a raw type-4 transaction and recover its signers
    Inspect(InspectArgs),

    /// Show whether an account is a plain EOA, delegated, or a contract
    CheckCode(CheckCodeArgs),
}

#[derive(Debug, Args)]
struct AuthorizeArgs {
    #[arg(long)]
    chain_id: u64,

    /// Delegate contract address
    #[arg(long)]
    delegate: Address,

    /// Authorizer account nonce the tuple is valid for
    #[arg(long)]
    nonce: u64,

    /// Environment variable holding the authorizer's private key
    #[arg(long, default_value = "AUTHORIZER_KEY")]
    key_env: String,
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Relay configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Delegate call description (JSON: {"single": {...}} or {"batch": [...]})
    #[arg(long)]
    call: PathBuf,

    #[arg(long, default_value = "AUTHORIZER_KEY")]
    authorizer_key_env: String,

    /// Sponsor pays for the transaction when set; otherwise the authorizer pays
    #[arg(long)]
    sponsor_key_env: Option<String>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Raw transaction hex (0x optional)
    raw: String,
}

#[derive(Debug, Args)]
struct CheckCodeArgs {
    #[arg(long)]
    config: PathBuf,

    address: Address,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> RelayResult<()> {
    match command {
        Commands::Authorize(args) => authorize(args),
        Commands::Send(args) => send(args),
        Commands::Inspect(args) => inspect(args),
        Commands::CheckCode(args) => check_code(args),
    }
}

fn authorize(args: AuthorizeArgs) -> RelayResult<()> {
    let key = read_key(&args.key_env, Stage::Authorization)?;
    let authorization = sign_authorization(&key, args.chain_id, args.delegate, args.nonce)?;
    let digest = authorization_signing_hash(args.chain_id, &args.delegate, args.nonce);

    print_json(&json!({
        "signer": key.address()?,
        "digest": format!("0x{}", hex::encode(digest)),
        "authorization": authorization,
    }))
}

fn send(args: SendArgs) -> RelayResult<()> {
    let config = RelayConfig::load(&args.config)?;
    let call_json = std::fs::read_to_string(&args.call)
        .map_err(|e| RelayError::config("call", format!("cannot read {}: {}", args.call.display(), e)))?;
    let call: DelegateCall =
        serde_json::from_str(&call_json).map_err(|e| RelayError::config("call", e.to_string()))?;

    let authorizer = read_key(&args.authorizer_key_env, Stage::Authorization)?;
    // The sponsor key only signs the outer transaction
    let sponsor = args
        .sponsor_key_env
        .as_deref()
        .map(|var| read_key(var, Stage::Assembly))
        .transpose()?;
    let signers = match &sponsor {
        Some(sponsor) => Signers::sponsored(&authorizer, sponsor),
        None => Signers::self_sponsored(&authorizer),
    };

    let relayer = Relayer::new(JsonRpcNode::from_config(&config)?, &config);
    let request = DelegationRequest::from_config(&config, call);
    let outcome = relayer.send(&request, &signers)?;

    print_json(&outcome)
}

fn inspect(args: InspectArgs) -> RelayResult<()> {
    let signed = decode_raw_transaction_hex(&args.raw)?;
    let raw = signed.raw();

    let authorizations: Vec<_> = signed
        .tx
        .authorization_list()
        .iter()
        .map(|auth| {
            json!({
                "authorization": auth,
                "signer": recover_authorization_signer(auth).ok(),
            })
        })
        .collect();

    print_json(&json!({
        "hash": raw.hash(),
        "signing_hash": format!("0x{}", hex::encode(signed.signing_hash())),
        "payer": recover_transaction_signer(&signed).ok(),
        "transaction": signed.tx.fields(),
        "signature": signed.signature,
        "authorizations": authorizations,
    }))
}

fn check_code(args: CheckCodeArgs) -> RelayResult<()> {
    let config = RelayConfig::load(&args.config)?;
    let relayer = Relayer::new(JsonRpcNode::from_config(&config)?, &config);
    let code = relayer.check_code(&args.address)?;

    print_json(&json!({ "address": args.address, "code": code }))
}

/// Keys are read from the environment at the edge and never logged.
/// A malformed key is reported against the stage that signs with it.
fn read_key(var: &str, stage: Stage) -> RelayResult<PrivateKey> {
    let value = Zeroizing::new(
        std::env::var(var)
            .map_err(|_| RelayError::config("key_env", format!("environment variable {} is not set", var)))?,
    );
    PrivateKey::from_hex(&value, stage)
}

fn print_json<T: Serialize>(value: &T) -> RelayResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
