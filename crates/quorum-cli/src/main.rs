//! Quorum CLI
//!
//! Command-line tool for running a threshold signing group locally:
//! - Key share generation and refresh
//! - Threshold signing and verification
//! - Signed access grants for cloud resources

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quorum_core::authz::{
    AccessProof, AccessValidator, AuthorizationRequest, Provider, ProviderValidator, SessionCounter,
};
use quorum_core::{
    generate, keygen, session_message, verify_encoded, KeyShareSet, ParticipantIndex,
    PublicKeyPackage, SecretShare, SessionId, Signature, SignerSession, SigningSession,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// Quorum - threshold signing group operator
#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Threshold Schnorr signing over secp256k1")]
#[command(version)]
struct Cli {
    /// Data directory for key shares and group files
    #[arg(short, long, env = "QUORUM_DEST", default_value = "./data")]
    dest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new set of key shares
    Keygen {
        /// Number of participants
        #[arg(short, long)]
        n: ParticipantIndex,

        /// Threshold (t-of-n)
        #[arg(short, long)]
        t: ParticipantIndex,
    },

    /// Refresh all key shares, keeping the group key
    Refresh,

    /// Sign a message with a set of participants
    Sign {
        /// Message to sign (UTF-8)
        #[arg(short, long)]
        message: String,

        /// Participating indices (comma-separated, 1-based)
        #[arg(short, long)]
        signers: String,
    },

    /// Verify a signature against the group key
    Verify {
        /// Signed message (UTF-8)
        #[arg(short, long)]
        message: String,

        /// r component (hex)
        #[arg(short)]
        r: String,

        /// s component (hex)
        #[arg(short)]
        s: String,

        /// Recovery id
        #[arg(short, default_value_t = 0)]
        v: u8,

        /// Session the signature was produced in, as printed by `sign`
        #[arg(long)]
        session: Option<SessionId>,
    },

    /// Sign an access grant and check it as a provider connector would
    Grant {
        /// Cloud provider
        #[arg(long, value_enum)]
        provider: ProviderArg,

        /// Provider resource name
        #[arg(long)]
        resource: String,

        /// Principal requesting access
        #[arg(long)]
        principal: String,

        /// Action to authorize
        #[arg(long)]
        action: String,

        /// Participating indices (comma-separated, 1-based)
        #[arg(short, long)]
        signers: String,
    },

    /// Show group info
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Aws,
    Gcp,
    Azure,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Aws => Provider::Aws,
            ProviderArg::Gcp => Provider::Gcp,
            ProviderArg::Azure => Provider::Azure,
        }
    }
}

/// Last issued session identifier, persisted between runs
#[derive(Default, Serialize, Deserialize)]
struct SessionLog {
    last_session_id: SessionId,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.dest)?;

    match cli.command {
        Commands::Keygen { n, t } => run_keygen(&cli, n, t),
        Commands::Refresh => run_refresh(&cli),
        Commands::Sign {
            ref message,
            ref signers,
        } => run_sign(&cli, message, signers),
        Commands::Verify {
            ref message,
            ref r,
            ref s,
            v,
            session,
        } => run_verify(&cli, message, r, s, v, session),
        Commands::Grant {
            provider,
            ref resource,
            ref principal,
            ref action,
            ref signers,
        } => run_grant(&cli, provider.into(), resource, principal, action, signers),
        Commands::Info => show_info(&cli),
    }
}

fn run_keygen(cli: &Cli, n: ParticipantIndex, t: ParticipantIndex) -> Result<()> {
    info!(n_parties = n, threshold = t, "Generating key shares");

    let set = generate(n, t)?;
    save_set(cli, &set)?;

    info!(
        public_key = %set.group_public_key().to_hex(),
        path = ?cli.dest,
        "Key shares saved"
    );

    println!("Group Public Key: {}", set.group_public_key().to_hex());

    Ok(())
}

fn run_refresh(cli: &Cli) -> Result<()> {
    let set = load_full_set(cli)?;

    info!(total = set.total(), threshold = set.threshold(), "Starting key refresh");

    let refreshed = keygen::refresh(&set)?;
    save_set(cli, &refreshed)?;

    info!("Key refresh completed");

    Ok(())
}

fn run_sign(cli: &Cli, message: &str, signers: &str) -> Result<()> {
    let package = load_package(cli)?;
    let indices = parse_signers(signers)?;
    let session_id = next_session_id(cli)?;

    info!(
        session_id,
        participants = ?indices,
        message = message,
        "Starting signing session"
    );

    let signature = sign_locally(cli, &package, &indices, session_id, message.as_bytes())?;

    info!(
        r = hex::encode(signature.r),
        s = hex::encode(signature.s),
        recovery_id = signature.recovery_id,
        "Signature generated"
    );

    // Print signature
    println!("Signature:");
    println!("  session: {}", session_id);
    println!("  r: {}", hex::encode(signature.r));
    println!("  s: {}", hex::encode(signature.s));
    println!("  v: {}", signature.recovery_id);

    Ok(())
}

fn run_verify(
    cli: &Cli,
    message: &str,
    r: &str,
    s: &str,
    v: u8,
    session: Option<SessionId>,
) -> Result<()> {
    let package = load_package(cli)?;
    let (x, y) = package.group_public_key.to_coordinates()?;

    let r = hex::decode(r).context("r is not hex")?;
    let s = hex::decode(s).context("s is not hex")?;

    let message = match session {
        Some(session_id) => session_message(session_id, message.as_bytes()),
        None => message.as_bytes().to_vec(),
    };

    if verify_encoded(&message, &r, &s, v, &x, &y) {
        println!("Signature valid");
        Ok(())
    } else {
        bail!("Signature invalid")
    }
}

fn run_grant(
    cli: &Cli,
    provider: Provider,
    resource: &str,
    principal: &str,
    action: &str,
    signers: &str,
) -> Result<()> {
    let package = load_package(cli)?;
    let indices = parse_signers(signers)?;
    let session_id = next_session_id(cli)?;

    let request = AuthorizationRequest::new(resource, principal, action, session_id);
    info!(
        session_id,
        provider = ?provider,
        resource,
        principal,
        action,
        "Signing access grant"
    );

    let signature = sign_locally(cli, &package, &indices, session_id, &request.payload())?;
    let proof = AccessProof { request, signature };

    let validator = ProviderValidator::new(provider, package.group_public_key);
    let granted = validator.validate_access(resource, principal, &proof);

    println!("{}", serde_json::to_string_pretty(&proof)?);
    println!("Access granted: {}", granted);

    Ok(())
}

fn show_info(cli: &Cli) -> Result<()> {
    let package = load_package(cli)?;
    let (x, y) = package.group_public_key.to_coordinates()?;

    println!("Group Info:");
    println!("  N Parties: {}", package.total);
    println!("  Threshold: {}", package.threshold);
    println!("  Public Key: {}", package.group_public_key.to_hex());
    println!("  Public Key x: {}", hex::encode(x));
    println!("  Public Key y: {}", hex::encode(y));

    Ok(())
}

/// Run commit, sign and aggregate for the listed participants in-process
///
/// The signature covers `session_message(session_id, payload)`.
fn sign_locally(
    cli: &Cli,
    package: &PublicKeyPackage,
    indices: &[ParticipantIndex],
    session_id: SessionId,
    payload: &[u8],
) -> Result<Signature> {
    let shares = indices
        .iter()
        .map(|index| load_share(cli, *index))
        .collect::<Result<Vec<_>>>()?;

    let mut coordinator = SigningSession::new(
        session_id,
        payload,
        package.threshold,
        package.public_shares.clone(),
    )?;
    let mut signers: Vec<_> = shares
        .iter()
        .map(|share| SignerSession::new(session_id, share))
        .collect();

    for signer in &mut signers {
        coordinator.add_commitment(signer.commit()?)?;
    }
    let commitments = coordinator.seal_commitments()?;

    for signer in &mut signers {
        let share = signer.sign(payload, &commitments, &package.public_shares)?;
        coordinator.add_signature_share(share)?;
    }

    let signature = coordinator.aggregate()?;
    if !coordinator.verify(&package.group_public_key)? {
        bail!("Aggregated signature failed verification");
    }

    Ok(signature)
}

fn parse_signers(signers: &str) -> Result<Vec<ParticipantIndex>> {
    let indices = signers
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<std::result::Result<Vec<ParticipantIndex>, _>>()
        .context("Signers must be comma-separated indices")?;
    if indices.is_empty() {
        return Err(anyhow!("No signers given"));
    }
    Ok(indices)
}

fn next_session_id(cli: &Cli) -> Result<SessionId> {
    let path = cli.dest.join("session.json");
    let log: SessionLog = if path.exists() {
        serde_json::from_str(&std::fs::read_to_string(&path)?)?
    } else {
        SessionLog::default()
    };

    let session_id = SessionCounter::resume_after(log.last_session_id).next_id()?;
    write_json(
        &path,
        &SessionLog {
            last_session_id: session_id,
        },
    )?;
    Ok(session_id)
}

fn save_set(cli: &Cli, set: &KeyShareSet) -> Result<()> {
    write_json(&cli.dest.join("group.json"), &set.public_package())?;
    for share in set.shares() {
        write_json(&share_path(cli, share.index), share)?;
    }
    Ok(())
}

fn load_full_set(cli: &Cli) -> Result<KeyShareSet> {
    let package = load_package(cli)?;
    let shares = (1..=package.total)
        .map(|index| load_share(cli, index))
        .collect::<Result<Vec<_>>>()?;
    Ok(KeyShareSet::from_parts(package, shares)?)
}

fn load_package(cli: &Cli) -> Result<PublicKeyPackage> {
    let path = cli.dest.join("group.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Reading {}", path.display()))?;
    let package: PublicKeyPackage = serde_json::from_str(&json)?;
    package.params()?;
    Ok(package)
}

fn load_share(cli: &Cli, index: ParticipantIndex) -> Result<SecretShare> {
    let path = share_path(cli, index);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Reading {}", path.display()))?;
    let share: SecretShare = serde_json::from_str(&json)?;
    if share.index != index {
        bail!("{} holds the share of participant {}", path.display(), share.index);
    }
    Ok(share)
}

fn share_path(cli: &Cli, index: ParticipantIndex) -> PathBuf {
    cli.dest.join(format!("keyshare.{}.json", index))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}
